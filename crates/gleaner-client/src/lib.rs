pub mod navigator;

pub use navigator::{ChromeNavigator, NavigatorOptions};
