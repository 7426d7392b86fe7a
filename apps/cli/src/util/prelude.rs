pub use crate::print_output;
pub use crate::util::confirm::confirm_or_abort;
