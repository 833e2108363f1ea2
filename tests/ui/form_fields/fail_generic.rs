#[derive(hddui::form::FormFields)]
#[allow(dead_code)]
struct Wrapper<T> {
    value: T,
}

fn main() {}
