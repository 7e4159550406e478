//! Engine specifications and command construction.
//!
//! Each [`EngineId`] maps to one static [`EngineSpec`]: its binary, its
//! capability matrix, the transports it accepts, and the flag spellings it
//! uses. The spellings are a fixed table reproduced token-for-token from
//! each tool's CLI:
//!
//! | Engine | Danger flag | Stream-JSON flag | Resume latest | Resume id |
//! |--------|-------------|------------------|---------------|-----------|
//! | claude | `--permission-mode bypassPermissions` | `--output-format stream-json --include-partial-messages` | *(none)* | `-r <id>` |
//! | codex  | `--dangerously-bypass-approvals-and-sandbox` | `--json` | `resume --last` | `resume <id>` |
//! | gemini | `-y` | `-o stream-json` | `-r latest` | `-r <id>` |
//! | qwen   | `-y` | `-o stream-json` | `-c` | `-c <id>` |
//!
//! The fragment builders on [`EngineSpec`] are pure; [`builder`] stitches
//! them together after validating the request.

pub mod builder;

use crate::models::{EngineCapabilities, EngineId, PromptRef, RunOpts, Transport};

pub use builder::{build_command, explain_command, BuildContext, Command};

/// Per-engine flag spellings.
#[derive(Debug)]
pub struct FlagTable {
    /// Tokens following the binary on every invocation.
    pub head: &'static [&'static str],
    /// Permission bypass.
    pub danger: &'static [&'static str],
    /// Streamed JSON-Lines output.
    pub stream_json: &'static [&'static str],
    /// Model selection; the model name follows.
    pub model: &'static str,
    /// Continue the latest conversation, when the engine can.
    pub resume_latest: Option<&'static [&'static str]>,
    /// Resume a specific conversation; the id follows.
    pub resume_id: &'static [&'static str],
}

/// Static description of one engine.
#[derive(Debug)]
pub struct EngineSpec {
    /// Engine this spec describes.
    pub engine: EngineId,
    /// Executable name.
    pub binary: &'static str,
    /// Capability matrix.
    pub capabilities: EngineCapabilities,
    /// Transports the engine can be configured with.
    pub transports: &'static [Transport],
    /// Flag spellings.
    pub flags: FlagTable,
}

const ALL_CAPABILITIES: EngineCapabilities = EngineCapabilities {
    supports_stdin: true,
    supports_resume: true,
    supports_stream_json: true,
    supports_model_select: true,
    supports_permissions_bypass: true,
};

static CLAUDE: EngineSpec = EngineSpec {
    engine: EngineId::Claude,
    binary: "claude",
    capabilities: EngineCapabilities {
        supports_stdin: false,
        ..ALL_CAPABILITIES
    },
    transports: &[Transport::Cmdline],
    flags: FlagTable {
        head: &[],
        danger: &["--permission-mode", "bypassPermissions"],
        stream_json: &[
            "--output-format",
            "stream-json",
            "--include-partial-messages",
        ],
        model: "--model",
        resume_latest: None,
        resume_id: &["-r"],
    },
};

static CODEX: EngineSpec = EngineSpec {
    engine: EngineId::Codex,
    binary: "codex",
    capabilities: ALL_CAPABILITIES,
    transports: &[Transport::Cmdline],
    flags: FlagTable {
        head: &["exec"],
        danger: &["--dangerously-bypass-approvals-and-sandbox"],
        stream_json: &["--json"],
        model: "--model",
        resume_latest: Some(&["resume", "--last"]),
        resume_id: &["resume"],
    },
};

static GEMINI: EngineSpec = EngineSpec {
    engine: EngineId::Gemini,
    binary: "gemini",
    capabilities: ALL_CAPABILITIES,
    transports: &[Transport::Cmdline],
    flags: FlagTable {
        head: &[],
        danger: &["-y"],
        stream_json: &["-o", "stream-json"],
        model: "--model",
        resume_latest: Some(&["-r", "latest"]),
        resume_id: &["-r"],
    },
};

static QWEN: EngineSpec = EngineSpec {
    engine: EngineId::Qwen,
    binary: "qwen",
    capabilities: ALL_CAPABILITIES,
    transports: &[Transport::Cmdline, Transport::Stdio, Transport::Tcp],
    flags: FlagTable {
        head: &[],
        danger: &["-y"],
        stream_json: &["-o", "stream-json"],
        model: "--model",
        resume_latest: Some(&["-c"]),
        resume_id: &["-c"],
    },
};

/// Look up the static spec for `engine`.
#[must_use]
pub fn spec(engine: EngineId) -> &'static EngineSpec {
    match engine {
        EngineId::Claude => &CLAUDE,
        EngineId::Codex => &CODEX,
        EngineId::Gemini => &GEMINI,
        EngineId::Qwen => &QWEN,
    }
}

fn owned<'a>(tokens: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    tokens.iter().map(|t| (*t).to_owned())
}

impl EngineSpec {
    /// Transport actually used when `requested` is configured.
    ///
    /// Engines with a single transport always resolve to it.
    #[must_use]
    pub fn resolve_transport(&self, requested: Transport) -> Transport {
        if self.transports.contains(&requested) {
            requested
        } else {
            Transport::Cmdline
        }
    }

    /// Binary plus head tokens and every option flag, ending with
    /// `extra_args`.
    #[must_use]
    pub fn base_command(&self, opts: &RunOpts) -> Vec<String> {
        let mut argv = vec![self.binary.to_owned()];
        argv.extend(owned(self.flags.head));
        if opts.dangerously_skip_permissions {
            argv.extend(owned(self.flags.danger));
        }
        if opts.stream_json {
            argv.extend(owned(self.flags.stream_json));
        }
        if let Some(model) = opts.model.as_deref().filter(|m| !m.is_empty()) {
            argv.push(self.flags.model.to_owned());
            argv.push(model.to_owned());
        }
        argv.extend(opts.extra_args.iter().cloned());
        argv
    }

    /// Tokens that resume a prior conversation; empty for a new one.
    ///
    /// An explicit id wins over `continue_latest`. Engines without a
    /// "latest" spelling produce nothing for `continue_latest` alone.
    #[must_use]
    pub fn resume_args(&self, opts: &RunOpts) -> Vec<String> {
        if let Some(id) = opts.effective_resume_id() {
            let mut args: Vec<String> = owned(self.flags.resume_id).collect();
            args.push(id.to_owned());
            return args;
        }
        if opts.continue_latest {
            if let Some(latest) = self.flags.resume_latest {
                return owned(latest).collect();
            }
        }
        Vec::new()
    }

    /// Prompt token, omitted when the prompt travels on stdin.
    #[must_use]
    pub fn prompt_args(&self, prompt: &PromptRef) -> Vec<String> {
        if prompt.is_stdin {
            Vec::new()
        } else {
            vec![prompt.argv_text()]
        }
    }
}
