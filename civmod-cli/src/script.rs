//! Line-oriented edit scripts replayed against an [`EditorSession`].
//!
//! Each non-blank line that does not start with `#` is `NAME ARGS...`,
//! where `NAME` is looked up in [`COMMANDS`].

use std::io::Write;

use civmod::EditorSession;
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::Value;

type Handler = fn(&mut ScriptContext<'_>, &str) -> Result<()>;

pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub about: &'static str,
    handler: Handler,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "set",
        usage: "set PATH VALUE",
        about: "write a JSON value (bare words are strings)",
        handler: cmd_set,
    },
    CommandSpec {
        name: "get",
        usage: "get PATH",
        about: "print the value at PATH",
        handler: cmd_get,
    },
    CommandSpec {
        name: "unset",
        usage: "unset PATH",
        about: "delete a key or list element",
        handler: cmd_unset,
    },
    CommandSpec {
        name: "append",
        usage: "append PATH VALUE",
        about: "push VALUE onto the list at PATH",
        handler: cmd_append,
    },
    CommandSpec {
        name: "remove",
        usage: "remove PATH INDEX",
        about: "remove an element, shifting later ones down",
        handler: cmd_remove,
    },
    CommandSpec {
        name: "up",
        usage: "up PATH INDEX",
        about: "swap an element with its predecessor",
        handler: cmd_up,
    },
    CommandSpec {
        name: "down",
        usage: "down PATH INDEX",
        about: "swap an element with its successor",
        handler: cmd_down,
    },
    CommandSpec {
        name: "wizard",
        usage: "wizard",
        about: "enter the wizard, re-syncing staging from main",
        handler: cmd_wizard,
    },
    CommandSpec {
        name: "restart",
        usage: "restart",
        about: "reopen the wizard at step 1",
        handler: cmd_restart,
    },
    CommandSpec {
        name: "next",
        usage: "next",
        about: "advance to the next wizard step",
        handler: cmd_next,
    },
    CommandSpec {
        name: "prev",
        usage: "prev",
        about: "go back one wizard step",
        handler: cmd_prev,
    },
    CommandSpec {
        name: "finish",
        usage: "finish",
        about: "validate and merge the wizard into main",
        handler: cmd_finish,
    },
    CommandSpec {
        name: "expert",
        usage: "expert",
        about: "leave the wizard, merging staged edits",
        handler: cmd_expert,
    },
    CommandSpec {
        name: "step",
        usage: "step",
        about: "print the fields of the current wizard step",
        handler: cmd_step,
    },
    CommandSpec {
        name: "status",
        usage: "status",
        about: "print the status line",
        handler: cmd_status,
    },
    CommandSpec {
        name: "new",
        usage: "new",
        about: "discard everything and start an empty mod",
        handler: cmd_new,
    },
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// One line of input together with where it came from.
#[derive(Debug, Clone)]
pub struct ScriptLine {
    pub origin: String,
    pub text: String,
}

impl ScriptLine {
    pub fn from_script(contents: &str) -> Vec<ScriptLine> {
        contents
            .lines()
            .enumerate()
            .map(|(idx, text)| ScriptLine {
                origin: format!("line {}", idx + 1),
                text: text.to_string(),
            })
            .collect()
    }

    pub fn from_inline(commands: &[String]) -> Vec<ScriptLine> {
        commands
            .iter()
            .enumerate()
            .map(|(idx, text)| ScriptLine {
                origin: format!("command {}", idx + 1),
                text: text.clone(),
            })
            .collect()
    }
}

pub struct ScriptContext<'a> {
    pub session: &'a mut EditorSession,
    pub out: &'a mut dyn Write,
}

impl<'a> ScriptContext<'a> {
    pub fn new(session: &'a mut EditorSession, out: &'a mut dyn Write) -> Self {
        Self { session, out }
    }

    /// Runs every line in order, stopping at the first failure. Returns the
    /// number of commands executed.
    pub fn run(&mut self, lines: &[ScriptLine]) -> Result<usize> {
        let mut executed = 0;
        for line in lines {
            let text = line.text.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let (name, rest) = split_word(text);
            let spec = lookup(name).ok_or_else(|| {
                eyre!(
                    "{}: unknown command `{name}` (known: {})",
                    line.origin,
                    command_names()
                )
            })?;
            (spec.handler)(self, rest)
                .wrap_err_with(|| format!("{}: `{text}` failed (usage: {})", line.origin, spec.usage))?;
            tracing::debug!(origin = %line.origin, command = spec.name, "script command applied");
            executed += 1;
        }
        Ok(executed)
    }
}

fn command_names() -> String {
    COMMANDS
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(pos) => (&input[..pos], input[pos..].trim()),
        None => (input, ""),
    }
}

fn required<'a>(word: &'a str, what: &str) -> Result<&'a str> {
    if word.is_empty() {
        Err(eyre!("missing {what}"))
    } else {
        Ok(word)
    }
}

fn no_arguments(rest: &str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(eyre!("unexpected arguments `{rest}`"))
    }
}

/// JSON when it parses as JSON, otherwise the raw text as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn path_and_value(rest: &str) -> Result<(&str, Value)> {
    let (path, raw) = split_word(rest);
    let path = required(path, "PATH")?;
    let raw = required(raw, "VALUE")?;
    Ok((path, parse_value(raw)))
}

fn path_and_index(rest: &str) -> Result<(&str, usize)> {
    let (path, raw) = split_word(rest);
    let path = required(path, "PATH")?;
    let raw = required(raw, "INDEX")?;
    let index = raw
        .parse::<usize>()
        .wrap_err_with(|| format!("invalid INDEX `{raw}`"))?;
    Ok((path, index))
}

fn cmd_set(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    let (path, value) = path_and_value(rest)?;
    ctx.session.set(path, value)?;
    Ok(())
}

fn cmd_get(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    let path = required(rest, "PATH")?;
    match ctx.session.get(path)? {
        Some(value) => writeln!(ctx.out, "{path} = {value}")?,
        None => writeln!(ctx.out, "{path} is unset")?,
    }
    Ok(())
}

fn cmd_unset(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    let path = required(rest, "PATH")?;
    ctx.session.unset(path)?;
    Ok(())
}

fn cmd_append(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    let (path, value) = path_and_value(rest)?;
    ctx.session.append(path, value)?;
    Ok(())
}

fn cmd_remove(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    let (path, index) = path_and_index(rest)?;
    ctx.session.remove_at(path, index)?;
    Ok(())
}

fn cmd_up(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    let (path, index) = path_and_index(rest)?;
    ctx.session.move_up(path, index)?;
    Ok(())
}

fn cmd_down(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    let (path, index) = path_and_index(rest)?;
    ctx.session.move_down(path, index)?;
    Ok(())
}

fn cmd_wizard(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    ctx.session.switch_to_wizard()?;
    Ok(())
}

fn cmd_restart(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    ctx.session.start_wizard()?;
    Ok(())
}

fn cmd_next(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    ctx.session.next_step()?;
    Ok(())
}

fn cmd_prev(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    ctx.session.prev_step()?;
    Ok(())
}

fn cmd_finish(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    ctx.session.finish_wizard()?;
    Ok(())
}

fn cmd_expert(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    ctx.session.switch_to_expert();
    Ok(())
}

fn cmd_step(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    writeln!(ctx.out, "{}", ctx.session.wizard_state())?;
    for (name, value) in ctx.session.step_view() {
        match value {
            Some(value) => writeln!(ctx.out, "  {name} = {value}")?,
            None => writeln!(ctx.out, "  {name} is unset")?,
        }
    }
    Ok(())
}

fn cmd_status(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    writeln!(ctx.out, "{}", ctx.session.status().message())?;
    Ok(())
}

fn cmd_new(ctx: &mut ScriptContext<'_>, rest: &str) -> Result<()> {
    no_arguments(rest)?;
    ctx.session.new_mod();
    Ok(())
}
