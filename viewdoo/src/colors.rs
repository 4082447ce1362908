//! Terminal colors for diagnostics, disabled when stderr isn't a terminal.
use crate::config::get_config;
use colored::Colorize;

macro_rules! maybe {
    ($($name:ident),* $(,)?) => {
        $(
            fn $name(&self) -> String {
                let text = self.text();
                if get_config().general.tty {
                    Colorize::$name(text).to_string()
                } else {
                    text.to_string()
                }
            }
        )*
    };
}

pub trait MaybeColorize {
    fn text(&self) -> &str;

    maybe!(green, red, yellow, purple, bold, dimmed);
}

impl MaybeColorize for &str {
    fn text(&self) -> &str {
        self
    }
}

impl MaybeColorize for String {
    fn text(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_without_tty() {
        if !get_config().general.tty {
            assert_eq!(MaybeColorize::green(&"ok"), "ok");
            assert_eq!(MaybeColorize::red(&String::from("error")), "error");
        } else {
            assert!(MaybeColorize::green(&"ok").contains("ok"));
        }
    }
}
