//! Interactive selection of support bundle contents.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use serde_json::{json, Value};
use support_bundle_core::contract::OptionsProvider;
use support_bundle_core::options::BundleParameters;

/// Asks the user which sections to include in the bundle.
pub struct PromptOptions<R, W> {
    io: Mutex<(R, W)>,
}

impl PromptOptions<io::BufReader<io::Stdin>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptOptions<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Option<String> {
    write!(output, "{question}: ").ok()?;
    output.flush().ok()?;
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn ask_bool(input: &mut impl BufRead, output: &mut impl Write, question: &str, default: bool) -> bool {
    let hint = if default { "Y/n" } else { "y/N" };
    match ask(input, output, &format!("{question} [{hint}]")).as_deref() {
        Some("y") | Some("Y") | Some("yes") => true,
        Some("n") | Some("N") | Some("no") => false,
        Some("") | None => default,
        Some(other) => {
            tracing::warn!(answer = other, default, "Unrecognised answer, using default");
            default
        }
    }
}

fn ask_number(input: &mut impl BufRead, output: &mut impl Write, question: &str, default: u64) -> u64 {
    match ask(input, output, &format!("{question} [{default}]")) {
        Some(answer) if !answer.is_empty() => answer.parse().unwrap_or_else(|_| {
            tracing::warn!(answer = %answer, default, "Not a number, using default");
            default
        }),
        _ => default,
    }
}

fn ask_optional(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Option<String> {
    ask(input, output, question).filter(|answer| !answer.is_empty())
}

impl<R, W> OptionsProvider for PromptOptions<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn parameters(&self) -> BundleParameters {
        let mut params = BundleParameters::new();
        let Ok(mut guard) = self.io.lock() else {
            return params;
        };
        let (input, output) = &mut *guard;

        params.insert(
            "configuration".into(),
            Value::Bool(ask_bool(input, output, "Include configuration files", true)),
        );
        params.insert(
            "system".into(),
            Value::Bool(ask_bool(input, output, "Include system information", true)),
        );

        let include_logs = ask_bool(input, output, "Include logs", true);
        let mut logs = json!({ "include": include_logs });
        if include_logs {
            if let Some(start) = ask_optional(input, output, "Logs start date (YYYY-MM-DD, empty for default)") {
                logs["start_date"] = Value::String(start);
            }
            if let Some(end) = ask_optional(input, output, "Logs end date (YYYY-MM-DD, empty for default)") {
                logs["end_date"] = Value::String(end);
            }
        }
        params.insert("logs".into(), logs);

        let count = ask_number(input, output, "Number of thread dumps", 1);
        let interval = if count > 1 {
            ask_number(input, output, "Interval between thread dumps in milliseconds", 0)
        } else {
            0
        };
        params.insert(
            "thread_dump".into(),
            json!({ "count": count, "interval": interval }),
        );
        params
    }
}
