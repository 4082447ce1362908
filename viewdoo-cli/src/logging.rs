use viewdoo::colors::MaybeColorize;

pub fn ok(something: impl ToString) {
    eprintln!("{} {}", "ok".green(), something.to_string());
}

pub fn rendered(something: impl ToString) {
    eprintln!("{} {}", "rendered".green(), something.to_string());
}

pub fn watching(something: impl ToString) {
    eprintln!("{} {}", "watching".purple(), something.to_string());
}

pub fn error(something: impl ToString) {
    eprintln!("{}: {}", "error".red(), something.to_string());
}
