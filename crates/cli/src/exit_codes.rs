//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — scripts rely on them.
//!
//! | Code | Description                                     |
//! |------|-------------------------------------------------|
//! | 0    | Success                                         |
//! | 1    | General error (bad config, IO failure)          |
//! | 2    | Usage error (bad args, unreadable input path)   |
//! | 3    | Header row not found in an input file           |
//! | 4    | Mandatory dataset empty / nothing to write      |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - config or IO failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Header row not found within the search window; the dataset is
/// unavailable and nothing was processed.
pub const EXIT_HEADER_NOT_FOUND: u8 = 3;

/// A mandatory dataset was empty, or a requested output had no rows.
pub const EXIT_EMPTY_DATASET: u8 = 4;
