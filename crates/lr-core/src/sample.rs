//! Demo log files for trying the redactor.

use std::io;
use std::path::{Path, PathBuf};

pub const ONPREM_FILE_NAME: &str = "sample_onprem.log";
pub const ATLAS_FILE_NAME: &str = "sample_atlas.log";

const ONPREM_SAMPLE: &str = concat!(
    r#"2025-07-15T11:49:10.372+0000 I  COMMAND  [conn297396] command default.outbound_survey command: aggregate { aggregate: "outbound_survey", pipeline: [ { $match: { $and: [ { phone_number: "60124471286" }, { createdAt: { $gt: 1751975350218.0 } } ] } } ], cursor: {}, lsid: { id: UUID("18dc6629-9262-4055-b3fa-6c00285da25b") }, $db: "default" } planSummary: IXSCAN { phone_number: 1 } keysExamined:15 docsExamined:15 nreturned:1 reslen:4118 protocol:op_msg 151ms"#,
    "\n",
    r#"2025-07-15T11:49:10.373+0000 I  COMMAND  [conn297382] command default.customers command: find { find: "customers", filter: { email: "jane.doe@example.com" }, $db: "default" } planSummary: IXSCAN { email: 1 } keysExamined:1 docsExamined:1 nreturned:1 reslen:812 protocol:op_msg 3ms"#,
    "\n",
    "2025-07-15T11:49:10.468+0000 I  NETWORK  [conn297484] end connection 10.201.32.211:38282 (138 connections now open)\n",
    "2025-07-15T11:49:11.002+0000 I  NETWORK  [listener] connection accepted from 10.201.40.7:51544 #297485 (139 connections now open)\n",
);

const ATLAS_SAMPLE: &str = concat!(
    r#"{"t":{"$date":"2025-07-16T05:18:53.846+00:00"},"s":"I","c":"NETWORK","id":22944,"ctx":"conn15191","msg":"Connection ended","attr":{"remote":"192.168.248.116:45292","isLoadBalanced":false,"uuid":{"uuid":{"$uuid":"d2b52b4f-2a9d-4033-ab45-b3b4de28de12"}},"connectionId":15191,"connectionCount":84}}"#,
    "\n",
    r#"{"t":{"$date":"2025-07-16T05:18:53.846+00:00"},"s":"I","c":"NETWORK","id":22944,"ctx":"conn15192","msg":"Connection ended","attr":{"remote":"192.168.248.116:45314","isLoadBalanced":false,"uuid":{"uuid":{"$uuid":"0be2ba28-d4ef-4565-9dbb-73d100f1576c"}},"connectionId":15192,"connectionCount":83}}"#,
    "\n",
    r#"{"t":{"$date":"2025-07-16T05:19:38.920+00:00"},"s":"I","c":"NETWORK","id":22943,"ctx":"listener","msg":"Connection accepted","attr":{"remote":"192.168.248.116:52366","isLoadBalanced":false,"uuid":{"uuid":{"$uuid":"ac7e5a08-53b5-4b6f-87bf-8d9d1f99b7a2"}},"connectionId":15193,"connectionCount":83}}"#,
    "\n",
);

/// Write both demo files into `dir`, creating it if needed.
pub fn write_samples(dir: &Path) -> io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(2);
    for (name, content) in [(ONPREM_FILE_NAME, ONPREM_SAMPLE), (ATLAS_FILE_NAME, ATLAS_SAMPLE)] {
        let path = dir.join(name);
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "sample written");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lr_redact::format::detect;
    use lr_redact::LogFormat;
    use tempfile::TempDir;

    #[test]
    fn test_samples_detect_as_expected() {
        let dir = TempDir::new().unwrap();
        let paths = write_samples(&dir.path().join("logs")).unwrap();
        assert_eq!(paths.len(), 2);

        let onprem = std::fs::read_to_string(&paths[0]).unwrap();
        let atlas = std::fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(detect(onprem.lines()), LogFormat::Freeform);
        assert_eq!(detect(atlas.lines()), LogFormat::Structured);
        assert!(atlas.lines().all(|l| serde_json::from_str::<serde_json::Value>(l).is_ok()));
    }
}
