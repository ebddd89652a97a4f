//! Command-line argument splitting.
//!
//! Build variables are activated with a single dash (`-debug`), which clap
//! would otherwise read as a cluster of short flags. They are pulled out of
//! the raw arguments before clap sees the rest.

/// Short flags clap still owns.
const RESERVED_SHORT: &[&str] = &["-h", "-V"];

/// Long options that take a separate value argument.
const VALUE_OPTIONS: &[&str] = &["--compiler", "--preprocessor", "--shell", "--slack"];

/// Raw arguments split into what clap parses and the active variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitArgs {
  /// Program name, options and the free target, in their original order.
  pub clap_args: Vec<String>,
  /// Variable names in activation order, without the leading dash.
  pub variables: Vec<String>,
}

/// Split `args` (including the program name) into clap arguments and
/// variables. Everything after `--` is left to clap.
pub fn split_args<I>(args: I) -> SplitArgs
where
  I: IntoIterator<Item = String>,
{
  let mut split = SplitArgs::default();
  let mut args = args.into_iter();

  if let Some(program) = args.next() {
    split.clap_args.push(program);
  }

  let mut expects_value = false;
  let mut passthrough = false;
  for arg in args {
    if passthrough || expects_value {
      expects_value = false;
      split.clap_args.push(arg);
      continue;
    }

    if arg == "--" {
      passthrough = true;
      split.clap_args.push(arg);
    } else if arg.starts_with("--") {
      expects_value = VALUE_OPTIONS.contains(&arg.as_str());
      split.clap_args.push(arg);
    } else if is_variable(&arg) {
      split.variables.push(arg[1..].to_string());
    } else {
      split.clap_args.push(arg);
    }
  }

  split
}

fn is_variable(arg: &str) -> bool {
  arg.len() >= 2 && arg.starts_with('-') && !RESERVED_SHORT.contains(&arg)
}
