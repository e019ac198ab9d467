//! Renders the in-container patch procedure
//!
//! The output is a POSIX `sh` script meant for `sh -s` on standard input. It
//! carries an awk program that applies the same rules as
//! [`merge_preferences`](super::merge::merge_preferences), with the desired
//! assignment lines pre-formatted on the host.

use super::merge::format_assignment;
use super::policy::PreferenceTarget;
use super::value::PreferenceSet;

/// Printed (exit 0) when the preference file does not exist
pub const ABSENT_MARKER: &str = "onion-portal:prefs-absent";

const AWK_DELIMITER: &str = "__ONION_PORTAL_AWK__";

/// Build the full shell script for `target`
pub fn render_patch_script(target: &PreferenceTarget, desired: &PreferenceSet) -> String {
    let mut script = String::new();

    script.push_str("set -e\n");
    script.push_str(&format!("prefs_file='{}'\n", target.path));
    script.push_str("if [ ! -f \"$prefs_file\" ]; then\n");
    script.push_str(&format!("  echo '{}'\n", ABSENT_MARKER));
    script.push_str("  exit 0\n");
    script.push_str("fi\n");
    script.push_str("awk_file=\"${TMPDIR:-/tmp}/onion-portal-prefs.$$.awk\"\n");
    script.push_str("tmp_file=\"$prefs_file.onion-portal.$$\"\n");
    script.push_str("trap 'rm -f \"$awk_file\" \"$tmp_file\"' EXIT\n");
    script.push_str(&format!("cat > \"$awk_file\" <<'{}'\n", AWK_DELIMITER));
    script.push_str(&render_awk_program(target, desired));
    script.push_str(AWK_DELIMITER);
    script.push('\n');
    script.push_str("awk -f \"$awk_file\" \"$prefs_file\" > \"$tmp_file\"\n");
    // overwrite in place so the file keeps its owner and mode
    script.push_str("cat \"$tmp_file\" > \"$prefs_file\"\n");

    script
}

/// The awk program alone
pub fn render_awk_program(target: &PreferenceTarget, desired: &PreferenceSet) -> String {
    let kw = &target.keyword;
    let mut awk = String::new();

    awk.push_str("BEGIN {\n    n = 0\n");
    for (key, value) in desired.iter() {
        let line = format_assignment(kw, key, value);
        awk.push_str(&format!(
            "    n++; order[n] = \"{k}\"; want[\"{k}\"] = \"{v}\"\n",
            k = awk_escape(key),
            v = awk_escape(&line)
        ));
    }
    awk.push_str("}\n");

    awk.push_str("{\n");
    awk.push_str("    line = $0\n");
    awk.push_str(&format!(
        "    if (line ~ /^[ \\t]*{}\\(\"[^\"]*\",[ \\t]*.*\\);[ \\t\\r]*$/) {{\n",
        kw
    ));
    awk.push_str("        key = line\n");
    awk.push_str(&format!("        sub(/^[ \\t]*{}\\(\"/, \"\", key)\n", kw));
    awk.push_str("        key = substr(key, 1, index(key, \"\\\"\") - 1)\n");
    awk.push_str("        if (key in want) {\n");
    awk.push_str("            if (!(key in seen)) {\n");
    awk.push_str("                print want[key]\n");
    awk.push_str("                seen[key] = 1\n");
    awk.push_str("            }\n");
    awk.push_str("            next\n");
    awk.push_str("        }\n");
    awk.push_str("    }\n");
    awk.push_str("    print line\n");
    awk.push_str("}\n");

    awk.push_str("END {\n");
    awk.push_str("    for (i = 1; i <= n; i++) {\n");
    awk.push_str("        if (!(order[i] in seen)) print want[order[i]]\n");
    awk.push_str("    }\n");
    awk.push_str("}\n");

    awk
}

fn awk_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ServiceName;
    use crate::prefs::merge::{merge_preferences, LineMatcher};
    use crate::prefs::policy::i2p_proxy_policy;
    use crate::prefs::value::PrefValue;
    use std::io::Write;
    use std::path::Path;
    use std::process::{Command, Stdio};

    fn target_at(path: &Path) -> PreferenceTarget {
        PreferenceTarget::new(
            ServiceName::new("i2p-browser"),
            path.to_string_lossy().into_owned(),
            "user_pref",
        )
        .unwrap()
    }

    fn run_locally(script: &str) -> Option<(i32, String)> {
        if which::which("sh").is_err() || which::which("awk").is_err() {
            return None;
        }
        let mut child = Command::new("sh")
            .arg("-s")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child.stdin.take().unwrap().write_all(script.as_bytes()).unwrap();
        let out = child.wait_with_output().unwrap();
        Some((out.status.code().unwrap_or(-1), String::from_utf8_lossy(&out.stdout).into_owned()))
    }

    #[test]
    fn test_script_shape() {
        let target = PreferenceTarget::i2p_browser();
        let policy = i2p_proxy_policy().unwrap();
        let script = render_patch_script(&target, &policy);

        assert!(script.starts_with("set -e\n"));
        assert!(script.contains("prefs_file='/config/firefox/i2p.default/user.js'\n"));
        assert!(script.contains(ABSENT_MARKER));
        assert!(script.contains(
            r#"want["network.proxy.http_port"] = "user_pref(\"network.proxy.http_port\", 4444);""#
        ));
        assert!(script.contains(
            r#"want["keyword.enabled"] = "user_pref(\"keyword.enabled\", false);""#
        ));
        assert_eq!(script.matches(AWK_DELIMITER).count(), 2);
    }

    #[test]
    fn test_awk_string_escaping() {
        assert_eq!(awk_escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn test_local_run_matches_host_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.js");
        let initial = "// Firefox prefs\n\
                        user_pref(\"browser.startup.page\", 3);\n\
                        user_pref(\"network.proxy.http\", \"10.0.0.1\");\n\
                        \n\
                        user_pref(\"network.proxy.type\", 0);\n\
                        user_pref(\"network.proxy.type\", 5);\n\
                        user_pref(\"broken\", 1)\n";
        std::fs::write(&path, initial).unwrap();

        let target = target_at(&path);
        let mut desired = i2p_proxy_policy().unwrap();
        desired.insert("test.quoted", PrefValue::from(r#"say "hi" \o/"#)).unwrap();

        let Some((status, stdout)) = run_locally(&render_patch_script(&target, &desired)) else {
            return;
        };
        assert_eq!(status, 0);
        assert!(!stdout.contains(ABSENT_MARKER));

        let expected = merge_preferences(initial, &target.matcher().unwrap(), &desired);
        let patched = std::fs::read_to_string(&path).unwrap();
        assert_eq!(patched, expected);

        // second pass leaves the file byte-identical
        run_locally(&render_patch_script(&target, &desired)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), patched);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_local_run_crlf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.js");
        let initial = "// Firefox prefs\r\n\
                        user_pref(\"network.proxy.type\", 0);\r\n\
                        user_pref(\"browser.startup.page\", 3);\r\n";
        std::fs::write(&path, initial).unwrap();

        let target = target_at(&path);
        let desired = i2p_proxy_policy().unwrap();

        let Some((status, _)) = run_locally(&render_patch_script(&target, &desired)) else {
            return;
        };
        assert_eq!(status, 0);

        let expected = merge_preferences(initial, &target.matcher().unwrap(), &desired);
        let patched = std::fs::read_to_string(&path).unwrap();
        assert_eq!(patched, expected);
        assert_eq!(patched.matches("\"network.proxy.type\"").count(), 1);
    }

    #[test]
    fn test_local_run_absent_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("user.js");
        let target = target_at(&path);

        let Some((status, stdout)) =
            run_locally(&render_patch_script(&target, &i2p_proxy_policy().unwrap()))
        else {
            return;
        };
        assert_eq!(status, 0);
        assert_eq!(stdout.trim(), ABSENT_MARKER);
        assert!(!path.exists());
    }
}
