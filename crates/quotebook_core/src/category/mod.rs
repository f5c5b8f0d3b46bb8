//! Category projection over the quote store.

pub mod category_index;
