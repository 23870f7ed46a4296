use std::str::FromStr;

use anyhow::{Context, bail};

/// Rows printed by `show` when no count is given
pub const DEFAULT_SHOW_COUNT: usize = 20;

/// Console commands read from stdin, one per line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Make a view active
    View(usize),
    /// Install a filter on the active view, or clear it
    Filter(Option<String>),
    Format(String),
    /// Select a row of the active view and sync the others
    Select(usize),
    /// Look up the store index nearest a timestamp
    Goto(i64),
    Show { start: usize, count: usize },
    Count,
    Follow(bool),
    Pause,
    Resume,
    Clear,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name {
            "view" => Command::View(number(rest, "view number")?),
            "filter" => Command::Filter((!rest.is_empty()).then(|| rest.to_string())),
            "format" => {
                if rest.is_empty() {
                    bail!("format needs a template");
                }
                Command::Format(rest.to_string())
            }
            "select" => Command::Select(number(rest, "row")?),
            "goto" => Command::Goto(number(rest, "timestamp")?),
            "show" => {
                let mut args = rest.split_whitespace();
                let start = number(args.next().unwrap_or_default(), "start row")?;
                let count = match args.next() {
                    Some(count) => number(count, "row count")?,
                    None => DEFAULT_SHOW_COUNT,
                };
                if args.next().is_some() {
                    bail!("show takes at most two arguments");
                }
                Command::Show { start, count }
            }
            "count" => Command::Count,
            "follow" => match rest {
                "on" => Command::Follow(true),
                "off" => Command::Follow(false),
                other => bail!("follow expects 'on' or 'off', got '{}'", other),
            },
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command '{}' (try 'help')", other),
        };
        Ok(command)
    }
}

fn number<T>(text: &str, what: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if text.is_empty() {
        bail!("missing {}", what);
    }
    text.parse()
        .with_context(|| format!("invalid {} '{}'", what, text))
}

pub const HELP: &str = "\
commands:
  view N               make view N active
  filter EXPR          filter the active view, e.g. filter module eq \"net\"
  filter               remove the active view's filter
  format TEMPLATE      set the display format, e.g. format [{timestamp}] {message}
  select ROW           select a row and sync the other views to its time
  goto TS              store index nearest to a timestamp
  show START [COUNT]   print rows of the active view
  count                row counts of the store and every view
  follow on|off        print new rows of the active view as they arrive
  pause | resume       control the producer
  clear                remove every record from the store
  quit                 exit";
