#![allow(clippy::cast_possible_truncation)]

pub use self::{
    dialog::Dialog,
    help_dialog::HelpDialog,
    list::{List, State as ListState},
    scrollbar::ScrollBar,
};

mod dialog;
mod help_dialog;
mod list;
mod scrollbar;
