//! Transcoder argument rewriting
//!
//! The media server hands the transcoder callback URLs on its loopback
//! address. A worker pod cannot reach the server's loopback, so those URLs
//! are pointed at the server's cluster-internal address before the command
//! is forwarded.

use std::ffi::OsString;

/// Loopback address the media server uses in callback URLs
pub const LOOPBACK_ADDRESS: &str = "http://127.0.0.1:32400";

/// Flags whose value is a URL back to the media server
const CALLBACK_FLAGS: &[&str] = &["-progressurl", "-manifest_name", "-segment_list"];

/// Flags whose value is a log level
const LOG_LEVEL_FLAGS: &[&str] = &["-loglevel", "-loglevel_plex"];

const FORCED_LOG_LEVEL: &str = "debug";

/// Rewrites the value following each known flag in place
///
/// # Arguments
/// * `args` - Full argument vector, argument zero included
/// * `internal_address` - Replacement for [`LOOPBACK_ADDRESS`]
pub fn rewrite_args(args: &mut [String], internal_address: &str) {
    for i in 0..args.len() {
        let flag = args[i].as_str();
        let is_callback = CALLBACK_FLAGS.contains(&flag);
        let is_log_level = LOG_LEVEL_FLAGS.contains(&flag);

        let Some(value) = args.get_mut(i + 1) else {
            continue;
        };

        if is_callback {
            *value = value.replacen(LOOPBACK_ADDRESS, internal_address, 1);
        } else if is_log_level {
            *value = FORCED_LOG_LEVEL.to_string();
        }
    }
}

/// Collects the process arguments, rejecting any that are not UTF-8
///
/// The worker command is sent to the API server as JSON strings, so an
/// argument that cannot be represented exactly is an error rather than
/// being replaced lossily.
pub fn collect_args<I>(args: I) -> anyhow::Result<Vec<String>>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            arg.into_string()
                .map_err(|arg| anyhow::anyhow!("argument {} is not valid UTF-8: {:?}", i, arg))
        })
        .collect()
}
