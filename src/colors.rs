//! Semantic terminal color theme, layered over `colored::Colorize`.

use colored::{ColoredString, Colorize};

pub trait ThemeColor: Colorize + Sized {
    fn success(self) -> ColoredString {
        self.truecolor(80, 250, 210)
    }

    fn failure(self) -> ColoredString {
        self.truecolor(255, 90, 120)
    }

    fn info(self) -> ColoredString {
        self.truecolor(130, 170, 255)
    }

    fn warning(self) -> ColoredString {
        self.truecolor(255, 210, 100)
    }

    fn subtext(self) -> ColoredString {
        self.truecolor(100, 110, 150)
    }

    fn text(self) -> ColoredString {
        self.truecolor(220, 230, 255)
    }
}

impl<T: Colorize> ThemeColor for T {}
