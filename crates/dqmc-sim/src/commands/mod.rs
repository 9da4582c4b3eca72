pub mod chains;
pub mod check;
pub mod run;
