pub mod form;
pub mod format;
pub mod i18n;
pub mod lists;
pub mod prelude;
pub mod table;

mod subscription;

pub use crate::i18n::{I18nManager, Locale};
pub use crate::subscription::Subscription;
