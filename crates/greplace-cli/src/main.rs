use std::borrow::Cow;
use std::ffi::OsString;
use std::hash::{Hash, Hasher};
use std::io::{self, BufRead, ErrorKind, Write};

use greplace::{Aggregation, Cx, GROUP_REPLACE, GroupOutcome, registry_with_config};
use greplace_error::ReplaceError;
use greplace_ext_replace::ReplaceConfig;
use greplace_types::SqliteValue;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    function: String,
    config_path: Option<String>,
    max_iterations: Option<usize>,
    max_length: Option<usize>,
    show_help: bool,
}

/// A group identifier.
///
/// Groups compare by the canonical JSON text of their `group` value, so
/// `1` and `"1"` are different groups. `label` is what gets printed: a
/// string's contents, or the JSON text of anything else.
#[derive(Debug, Clone)]
struct GroupKey {
    json: String,
    label: String,
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.json == other.json
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.json.hash(state);
    }
}

impl GroupKey {
    fn from_json(group: &Value) -> Self {
        let json = group.to_string();
        let label = match group {
            Value::String(s) => s.clone(),
            _ => json.clone(),
        };
        Self { json, label }
    }
}

/// One input line: `{"group": <scalar>, "args": [<scalar>, ...]}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputRow {
    group: Value,
    args: Vec<Value>,
}

fn main() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut input, &mut stdout, &mut stderr);
    drop(input);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, R, W, E>(args: I, input: &mut R, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    let config = match load_config(&options) {
        Ok(config) => config,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            return 2;
        }
    };

    let rows = match read_rows(input) {
        Ok(rows) => rows,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            return 1;
        }
    };
    let Some(num_args) = rows.first().map(|(_, args)| args.len()) else {
        debug!("no input rows");
        return 0;
    };

    let aggregation = match registry_with_config(&config)
        .and_then(|registry| Aggregation::prepare(&registry, &options.function, num_args))
    {
        Ok(aggregation) => aggregation,
        Err(error) => {
            let _ = write_error(err, &error);
            return 1;
        }
    };

    info!(
        function = aggregation.name(),
        num_args,
        rows = rows.len(),
        "folding input"
    );
    let outcomes = aggregation.run(&Cx::new(), rows);
    match write_outcomes(out, &outcomes) {
        Ok(()) if outcomes.iter().all(|o| o.result.is_ok()) => 0,
        Ok(()) => 1,
        Err(error) => {
            let _ = writeln!(err, "error: failed writing results: {error}");
            1
        }
    }
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut function = String::from(GROUP_REPLACE);
    let mut config_path: Option<String> = None;
    let mut max_iterations: Option<usize> = None;
    let mut max_length: Option<usize> = None;
    let mut show_help = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        // Accept both `--flag value` and `--flag=value`.
        let (flag, inline) = match arg_str.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_owned())),
            _ => (arg_str, None),
        };
        let mut value_for = |flag: &str| -> Result<String, String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => iter
                    .next()
                    .map(|next| next.to_string_lossy().into_owned())
                    .ok_or_else(|| format!("missing argument for `{flag}`")),
            }
        };

        match flag {
            "-h" | "--help" => {
                show_help = true;
            }
            "--function" => {
                function = value_for(flag)?;
            }
            "--config" => {
                if config_path.is_some() {
                    return Err(String::from("`--config` may only be provided once"));
                }
                config_path = Some(value_for(flag)?);
            }
            "--max-iterations" => {
                max_iterations = Some(parse_usize_option(&value_for(flag)?, flag)?);
            }
            "--max-length" => {
                max_length = Some(parse_usize_option(&value_for(flag)?, flag)?);
            }
            _ if arg_str.starts_with('-') => {
                return Err(format!("unknown option `{arg_str}`"));
            }
            _ => {
                return Err(format!("unexpected argument `{arg_str}`"));
            }
        }
    }

    Ok(CliOptions {
        function,
        config_path,
        max_iterations,
        max_length,
        show_help,
    })
}

fn parse_usize_option(value: &str, flag: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("invalid integer for `{flag}`: `{value}`"))
}

/// Config file first, then flags on top; the result must validate.
fn load_config(options: &CliOptions) -> Result<ReplaceConfig, String> {
    let mut config = match options.config_path.as_deref() {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .map_err(|error| format!("failed reading config `{path}`: {error}"))?;
            serde_json::from_str::<ReplaceConfig>(&contents)
                .map_err(|error| format!("invalid config JSON `{path}`: {error}"))?
        }
        None => ReplaceConfig::default(),
    };
    if let Some(max_iterations) = options.max_iterations {
        config = config.with_max_iterations(max_iterations);
    }
    if let Some(max_length) = options.max_length {
        config = config.with_max_length(max_length);
    }
    config.validate().map_err(|error| error.to_string())?;
    Ok(config)
}

fn read_rows<R>(input: &mut R) -> Result<Vec<(GroupKey, Vec<SqliteValue>)>, String>
where
    R: BufRead,
{
    let mut rows = Vec::new();
    let mut line_buffer = String::new();
    let mut line_no = 0_usize;

    loop {
        line_buffer.clear();
        match input.read_line(&mut line_buffer) {
            Ok(0) => return Ok(rows),
            Ok(_) => {}
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(format!("failed reading input: {error}")),
        }
        line_no += 1;

        let line = line_buffer.trim();
        if line.is_empty() {
            continue;
        }
        let row: InputRow = serde_json::from_str(line)
            .map_err(|error| format!("line {line_no}: invalid row JSON: {error}"))?;
        let args = row
            .args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                json_to_value(arg)
                    .ok_or_else(|| format!("line {line_no}: argument {} is not a scalar", i + 1))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push((GroupKey::from_json(&row.group), args));
    }
}

/// Map a JSON scalar onto a SQL value. Arrays and objects have no mapping.
fn json_to_value(value: &Value) -> Option<SqliteValue> {
    match value {
        Value::Null => Some(SqliteValue::Null),
        Value::Bool(b) => Some(SqliteValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqliteValue::Integer(i)),
            None => n.as_f64().map(SqliteValue::Float),
        },
        Value::String(s) => Some(SqliteValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn write_outcomes<W>(out: &mut W, outcomes: &[GroupOutcome<GroupKey>]) -> io::Result<()>
where
    W: Write,
{
    for outcome in outcomes {
        let label = escape_field(&outcome.key.label);
        match &outcome.result {
            Ok(value) => writeln!(out, "{label}\t{}", escape_field(&format_result(value)))?,
            Err(error) => writeln!(
                out,
                "{label}\terror[{}]: {}",
                error.kind(),
                escape_field(&error.to_string())
            )?,
        }
    }
    out.flush()
}

/// Escape the characters that would break the one-line-per-group format.
fn escape_field(field: &str) -> Cow<'_, str> {
    if !field.contains(['\\', '\t', '\n', '\r']) {
        return Cow::Borrowed(field);
    }
    let mut escaped = String::with_capacity(field.len() + 8);
    for ch in field.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

fn format_result(value: &SqliteValue) -> String {
    match value {
        SqliteValue::Null => String::from("NULL"),
        other => other.to_text(),
    }
}

fn write_error<E>(err: &mut E, error: &ReplaceError) -> io::Result<()>
where
    E: Write,
{
    writeln!(err, "error[{}]: {error}", error.kind())?;
    if let Some(hint) = error.suggestion() {
        writeln!(err, "hint: {hint}")?;
    }
    Ok(())
}

fn write_usage<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Usage: greplace [--function NAME] [--config PATH] [--max-iterations N] [--max-length N]\n\
         \n\
         Reads one JSON row per line from stdin:\n\
         \n\
         {{\"group\": 1, \"args\": [\"Hello, NAME\", \"NAME\", \"Ada\"]}}\n\
         \n\
         and prints one `<group>\\t<result>` line per group, in first-seen order.\n\
         \n\
         Examples:\n\
         \n\
         greplace < rows.jsonl\n\
         greplace --max-iterations 1000 < rows.jsonl\n\
         greplace --config limits.json < rows.jsonl\n",
    )
}
