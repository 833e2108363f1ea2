#[derive(hddui::form::FormFields)]
#[allow(dead_code)]
struct Amount(String, u32);

fn main() {}
