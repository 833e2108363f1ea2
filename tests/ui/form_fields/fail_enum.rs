#[derive(hddui::form::FormFields)]
#[allow(dead_code)]
enum Status {
    Draft,
    Sent,
}

fn main() {}
