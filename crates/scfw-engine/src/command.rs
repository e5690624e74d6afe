//! Command-line normalization shared by the evaluator and the process
//! interceptor: unwrap shell/cmd wrapper invocations down to the
//! command-of-interest token.

/// Wrapper executables whose `-c`/`/c` argument is the command actually
/// being run, not the command itself.
const SHELL_WRAPPERS: &[&str] = &["sh", "bash", "zsh", "/bin/sh", "/bin/bash", "/bin/zsh"];
const CMD_WRAPPERS: &[&str] = &["cmd", "cmd.exe"];

/// Package managers whose install subcommand takes dependency names as
/// trailing arguments, not the leading command token.
const PACKAGE_MANAGERS: &[&str] = &["npm", "npx", "pnpm", "yarn", "pip", "pip3", "cargo"];
const INSTALL_SUBCOMMANDS: &[&str] = &["install", "i", "add"];

/// Minimal whitespace/quote-aware argv split. Good enough for classifying a
/// command line, not a full shell grammar — nested quoting edge cases fall
/// back to whitespace splitting.
pub fn split_argv(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = command.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn base_name(token: &str) -> &str {
    token.rsplit(['/', '\\']).next().unwrap_or(token)
}

/// The command-of-interest token: the leading argv token, with one level of
/// `sh -c "..."` / `cmd /c "..."` unwrapping applied.
/// Returns the unwrapped argv so callers can re-derive both the leading
/// token and the full inner command string.
pub fn unwrap_shell(argv: &[String]) -> Vec<String> {
    let Some(first) = argv.first() else {
        return argv.to_vec();
    };
    let name = base_name(first).to_lowercase();

    if SHELL_WRAPPERS.contains(&name.as_str()) {
        if let Some(pos) = argv.iter().position(|a| a == "-c") {
            if let Some(inner) = argv.get(pos + 1) {
                return split_argv(inner);
            }
        }
    }
    if CMD_WRAPPERS.contains(&name.as_str()) {
        if let Some(pos) = argv.iter().position(|a| a == "/c" || a == "/C") {
            if let Some(inner) = argv.get(pos + 1) {
                return split_argv(inner);
            }
        }
    }
    argv.to_vec()
}

/// The leading command token after wrapper-unwrapping, lower-cased base
/// name only (no path, no args) — what `allowed_commands` matches against.
pub fn leading_command(command: &str) -> String {
    let argv = split_argv(command);
    let unwrapped = unwrap_shell(&argv);
    unwrapped
        .first()
        .map(|t| base_name(t).to_lowercase())
        .unwrap_or_default()
}

/// The dependency-name arguments of a package-manager install invocation,
/// e.g. `["electorn"]` for `npm install electorn`. Empty when the leading
/// command isn't a recognized package manager, or it isn't running one of
/// `install`/`i`/`add` — this is what the malicious-package table must be
/// checked against, not `leading_command`, which only ever yields the
/// manager name itself.
pub fn install_package_args(command: &str) -> Vec<String> {
    let argv = split_argv(command);
    let unwrapped = unwrap_shell(&argv);
    let Some(first) = unwrapped.first() else {
        return Vec::new();
    };
    let manager = base_name(first).to_lowercase();
    if !PACKAGE_MANAGERS.contains(&manager.as_str()) {
        return Vec::new();
    }
    let Some(subcommand_pos) = unwrapped
        .iter()
        .skip(1)
        .position(|a| INSTALL_SUBCOMMANDS.contains(&a.as_str()))
        .map(|i| i + 1)
    else {
        return Vec::new();
    };
    unwrapped[subcommand_pos + 1..]
        .iter()
        .filter(|a| !a.starts_with('-'))
        .cloned()
        .collect()
}
