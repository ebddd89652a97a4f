//! Shared constants.

/// Descriptor implied for a single-project directory.
pub const DEFAULT_BUILD_FILE: &str = "build.json";

/// Descriptor implied for a batch directory.
pub const DEFAULT_BATCH_FILE: &str = "build_all.json";

/// Compiler options used when a source listing does not provide its own.
pub const DEFAULT_COMPILE_OPTIONS: &str = "--compress --mangle";

/// Suffix appended to a source's stem when no `output_file` is given.
pub const COMPILED_SOURCE_EXTENSION: &str = ".min.js";

/// Temporary artifact suffixes, appended to the final destination path.
pub const GLUE_FILE_EXTENSION: &str = ".glw";
pub const PREPROCESS_FILE_EXTENSION: &str = ".pre";
pub const COMPILE_FILE_EXTENSION: &str = ".cmp";

/// Default external tools.
pub const DEFAULT_COMPILER: &str = "uglifyjs";
pub const DEFAULT_PREPROCESSOR: &str = "metascript";

/// Interpreter used for `.js` event scripts.
pub const SCRIPT_INTERPRETER: &str = "node";

/// Character that marks a listing entry as a mask.
pub const MASK_CHAR: char = '*';
