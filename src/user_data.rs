//! Boot payload generation
//!
//! Builds the EC2 user-data script that provisions the instance on first
//! boot: installs the Python runtime and Flask, writes the application
//! source, and starts it backgrounded with its log redirected to a fixed
//! path.
//!
//! The application source is embedded through a quoted heredoc, so the shell
//! treats it as opaque literal text and performs no variable interpolation
//! on it.

use crate::config::{REMOTE_APP_PATH, REMOTE_LOG_PATH};
use anyhow::{bail, Result};

/// Heredoc delimiter for the embedded application source
const APP_DELIMITER: &str = "PARKING_APP_PAYLOAD";

/// Generate the user-data script embedding the application source verbatim.
///
/// The source must not contain the heredoc delimiter on a line of its own;
/// that would truncate the embedded payload.
pub fn generate_user_data(app_source: &str) -> Result<String> {
    if app_source
        .lines()
        .any(|line| line.trim_end() == APP_DELIMITER)
    {
        bail!(
            "Application source contains the reserved delimiter line '{}'",
            APP_DELIMITER
        );
    }

    // The heredoc body must end with a newline so the delimiter sits on its
    // own line.
    let newline_guard = if app_source.ends_with('\n') { "" } else { "\n" };

    Ok(format!(
        r#"#!/bin/bash
set -euo pipefail

exec > >(tee /var/log/parking-deploy-bootstrap.log) 2>&1

echo "Installing runtime..."
dnf install -y python3 python3-pip
pip3 install flask

echo "Writing application..."
cat > {app_path} <<'{delimiter}'
{app_source}{newline_guard}{delimiter}

chmod +x {app_path}
chown ec2-user:ec2-user {app_path}

echo "Starting application..."
nohup python3 {app_path} > {log_path} 2>&1 &
"#,
        app_path = REMOTE_APP_PATH,
        delimiter = APP_DELIMITER,
        app_source = app_source,
        newline_guard = newline_guard,
        log_path = REMOTE_LOG_PATH,
    ))
}

/// Extract the embedded application source from a generated payload.
///
/// Returns the bytes between the heredoc marker line and the closing
/// delimiter, including the terminating newline. For a newline-terminated
/// source this round-trips byte-for-byte with the original file.
pub fn extract_embedded_app(payload: &str) -> Option<&str> {
    let open = format!("<<'{}'\n", APP_DELIMITER);
    let close = format!("\n{}\n", APP_DELIMITER);

    let start = payload.find(&open)? + open.len();
    let end = payload[start..].rfind(&close)? + start;

    // Include the newline terminating the embedded source
    Some(&payload[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_SOURCE: &str = "import flask\n\napp = flask.Flask(__name__)\n\nif __name__ == '__main__':\n    app.run(host='0.0.0.0', port=8080)\n";

    #[test]
    fn payload_structure() {
        let script = generate_user_data(APP_SOURCE).unwrap();

        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains("set -euo pipefail"));
        assert!(script.contains("dnf install -y python3 python3-pip"));
        assert!(script.contains("pip3 install flask"));
        assert!(script.contains("cat > /home/ec2-user/app.py <<'PARKING_APP_PAYLOAD'"));
        assert!(script.contains("chmod +x /home/ec2-user/app.py"));
        assert!(script.contains("nohup python3 /home/ec2-user/app.py > /var/log/parking-app.log 2>&1 &"));
    }

    #[test]
    fn embedded_source_round_trips() {
        let script = generate_user_data(APP_SOURCE).unwrap();
        let extracted = extract_embedded_app(&script).unwrap();
        assert_eq!(extracted, APP_SOURCE);
    }

    #[test]
    fn shell_variables_in_source_are_not_interpolated() {
        let source = "cost = \"$HOURLY_RATE\"\nticket = `id`\n";
        let script = generate_user_data(source).unwrap();

        // Quoted heredoc: the payload carries the raw text
        let extracted = extract_embedded_app(&script).unwrap();
        assert_eq!(extracted, source);
    }

    #[test]
    fn source_without_trailing_newline_is_terminated() {
        let script = generate_user_data("print('hi')").unwrap();
        let extracted = extract_embedded_app(&script).unwrap();
        assert_eq!(extracted, "print('hi')\n");
    }

    #[test]
    fn delimiter_collision_is_rejected() {
        let source = format!("line one\n{}\nline two\n", APP_DELIMITER);
        assert!(generate_user_data(&source).is_err());
    }

    #[test]
    fn extract_from_unrelated_text_fails() {
        assert!(extract_embedded_app("#!/bin/bash\necho hi\n").is_none());
    }
}
