use hddui::form::{FieldType, FormFields};
use rust_decimal::Decimal;

#[allow(dead_code)]
#[derive(hddui::form::FormFields)]
struct ProfileForm {
    #[form(label = "Email", required)]
    email: String,
    age: Option<u32>,
    balance: Decimal,
    active: bool,
    #[form(field_type = "select")]
    city: String,
    #[form(skip)]
    internal_note: String,
}

fn main() {
    let fields = ProfileForm::form_fields();
    let names = fields.iter().map(|field| field.name()).collect::<Vec<_>>();
    assert_eq!(names, ["email", "age", "balance", "active", "city"]);
    assert_eq!(fields[0].display_label(), "Email");
    assert!(fields[0].is_required());
    assert_eq!(fields[1].kind(), FieldType::Number);
    assert_eq!(fields[2].kind(), FieldType::Number);
    assert_eq!(fields[3].kind(), FieldType::Checkbox);
    assert_eq!(fields[4].kind(), FieldType::Select);
}
