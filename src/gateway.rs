//! Access to the external id-utils index (`mkid` / `gid` / `lid`).

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::config::ToolsConfig;
use crate::matches::Match;

/// Source of raw index lines.
pub trait LookupGateway {
    /// Raw `file:line:text` occurrences of a literal pattern.
    fn lookup(&self, pattern: &str) -> Result<Vec<String>>;

    /// Raw whitespace-separated reference rows: symbol name, then referencing paths.
    fn symbol_references(&self, pattern: &str, verbose: bool) -> Result<Vec<String>>;
}

/// Look up `pattern` and parse the rows that really contain it.
///
/// The index sometimes reports rows without the pattern (numeric patterns in
/// particular), and may emit partial rows; both are dropped.
pub fn lookup_matches(gateway: &dyn LookupGateway, pattern: &str) -> Result<Vec<Match>> {
    let lines = gateway.lookup(pattern)?;
    let mut out = Vec::with_capacity(lines.len());
    for line in &lines {
        match Match::parse(line, pattern) {
            Some(m) => out.push(m),
            None if !line.is_empty() => crate::debug_log!("[gj] skip unmatched row: {line:?}"),
            None => {}
        }
    }
    Ok(out)
}

/// Decode tool output, dropping only the lines that are not valid UTF-8.
fn decode_lines(bytes: Vec<u8>) -> Vec<String> {
    match String::from_utf8(bytes) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(e) => {
            let bytes = e.into_bytes();
            bytes
                .split(|b| *b == b'\n')
                .filter_map(|line| match std::str::from_utf8(line) {
                    Ok(s) => Some(s.trim_end_matches('\r').to_string()),
                    Err(err) => {
                        crate::debug_log!(
                            "[gj] skip non-utf8 row ({err}): {}",
                            String::from_utf8_lossy(line)
                        );
                        None
                    }
                })
                .collect()
        }
    }
}

fn is_cmd_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

fn install_hint() -> String {
    if cfg!(target_os = "macos") {
        for (mgr, cmd) in [("brew", "brew install idutils"), ("port", "sudo port install idutils")] {
            if is_cmd_exists(mgr) {
                return cmd.to_string();
            }
        }
        return "  (Unknown package manager. Try to install id-utils anyway.)\n  (http://www.gnu.org/software/idutils/)"
            .to_string();
    }
    "sudo apt-get install id-utils".to_string()
}

/// Gateway backed by the id-utils command line tools.
#[derive(Debug, Clone)]
pub struct IdUtils {
    gid: String,
    lid: String,
    mkid: String,
    lang_map: Option<std::path::PathBuf>,
}

impl IdUtils {
    pub fn new(tools: &ToolsConfig) -> Self {
        let gid = tools.gid.clone().unwrap_or_else(|| {
            // Homebrew installs the lookup tool as `gid32` to avoid clashing with coreutils.
            if cfg!(target_os = "macos") && !is_cmd_exists("gid") {
                "gid32".to_string()
            } else {
                "gid".to_string()
            }
        });
        Self {
            gid,
            lid: tools.lid.clone(),
            mkid: tools.mkid.clone(),
            lang_map: tools.lang_map.clone(),
        }
    }

    /// Fail with an install hint when the index tools are not on `PATH`.
    pub fn check_install(&self) -> Result<()> {
        for cmd in [&self.mkid, &self.gid] {
            if !is_cmd_exists(cmd) {
                bail!(
                    "The program '{cmd}' is currently not installed.  You can install it by typing:\n{}",
                    install_hint()
                );
            }
        }
        Ok(())
    }

    /// Run `mkid` in the current directory and return its combined output.
    pub fn build_index(&self) -> Result<String> {
        let mut cmd = Command::new(&self.mkid);
        if let Some(map) = self.lang_map.as_ref() {
            cmd.arg("-m").arg(map);
        }
        crate::debug_log!("[gj] exec {cmd:?}");
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", self.mkid))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            bail!("{} exited with {}: {}", self.mkid, output.status, text.trim());
        }
        Ok(text)
    }

    fn execute(&self, program: &str, args: &[&str]) -> Result<Vec<String>> {
        crate::debug_log!("[gj] exec {program} {}", args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {program}"))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            crate::debug_log!("[gj] {program} ({}): {}", output.status, stderr.trim());
        }
        // A lookup with no hits exits non-zero; that is just an empty result.
        if !output.status.success() && output.stdout.is_empty() && mentions_missing_index(&stderr) {
            bail!(
                "{program} cannot find the index: {}\nRun `gj --index` in the project root first.",
                stderr.trim()
            );
        }
        Ok(decode_lines(output.stdout))
    }
}

/// Does tool diagnostics text complain about the `ID` index file?
fn mentions_missing_index(stderr: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[`'"‘“]ID['"’”]"#).unwrap())
        .is_match(stderr)
}

impl LookupGateway for IdUtils {
    fn lookup(&self, pattern: &str) -> Result<Vec<String>> {
        self.execute(&self.gid, &[pattern])
    }

    fn symbol_references(&self, pattern: &str, verbose: bool) -> Result<Vec<String>> {
        let mut args = vec!["-lis"];
        if !verbose {
            args.extend(["-R", "none"]);
        }
        args.push(pattern);
        self.execute(&self.lid, &args)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeGateway;
    use super::*;

    #[test]
    fn lookup_matches_skips_partial_and_unrelated_rows() {
        let gw = FakeGateway::default().with_lookup(
            "42",
            &[
                "a.c:1:int x = 42;",
                "a.c:2:int y = 7;",
                "truncated row",
                "",
                "b.c:9:return 42; // a:b",
            ],
        );
        let got = lookup_matches(&gw, "42").unwrap();
        let rows: Vec<_> = got.iter().map(|m| (m.filename.as_str(), m.line_num)).collect();
        assert_eq!(rows, vec![("a.c", 1), ("b.c", 9)]);
        assert_eq!(got[1].text, "return 42; // a:b");
    }

    #[test]
    fn decode_lines_drops_only_invalid_rows() {
        let mut bytes = b"a.c:1:ok\n".to_vec();
        bytes.extend_from_slice(b"b.c:2:\xff\xfe bad\n");
        bytes.extend_from_slice(b"c.c:3:fine\n");
        assert_eq!(decode_lines(bytes), vec!["a.c:1:ok", "c.c:3:fine", ""]);
    }

    #[test]
    fn decode_lines_valid_utf8() {
        assert_eq!(decode_lines(b"x:1:y\nz:2:w\n".to_vec()), vec!["x:1:y", "z:2:w"]);
    }

    #[test]
    fn missing_index_diagnostics() {
        assert!(mentions_missing_index("gid: can't locate `ID'"));
        assert!(mentions_missing_index("lid: can't open ‘ID’: No such file or directory"));
        assert!(!mentions_missing_index(""));
        assert!(!mentions_missing_index("gid: IDENT not found"));
    }

    #[cfg(unix)]
    #[test]
    fn lookup_without_index_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let script = tmp.path().join("gid");
        std::fs::write(&script, "#!/bin/sh\necho \"gid: can't locate \\`ID'\" >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let quiet = tmp.path().join("quiet-gid");
        std::fs::write(&quiet, "#!/bin/sh\nexit 1\n").unwrap();
        std::fs::set_permissions(&quiet, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tools = ToolsConfig {
            gid: Some(script.display().to_string()),
            ..ToolsConfig::default()
        };
        let err = IdUtils::new(&tools).lookup("Foo").unwrap_err();
        assert!(format!("{err:#}").contains("gj --index"));

        let tools = ToolsConfig {
            gid: Some(quiet.display().to_string()),
            ..ToolsConfig::default()
        };
        assert!(IdUtils::new(&tools).lookup("Foo").unwrap().is_empty());
    }

    #[test]
    fn missing_tool_is_reported() {
        let tools = ToolsConfig {
            gid: Some("gj-definitely-missing-gid".to_string()),
            mkid: "gj-definitely-missing-mkid".to_string(),
            ..ToolsConfig::default()
        };
        let err = IdUtils::new(&tools).check_install().unwrap_err();
        assert!(err.to_string().contains("gj-definitely-missing-mkid"));
    }
}
