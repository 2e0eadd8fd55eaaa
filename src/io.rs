//! File-boundary glue: JSON load/save for the three external DAG artifacts,
//! plus the one-row CSV summary line.
//!
//! Every function here takes a `&Path` and does exactly one read or one
//! write; nothing in this module inspects DAG semantics. That lives in
//! [`crate::dag`], [`crate::rewriter`], [`crate::mec`] and
//! [`crate::scheduler`] — this module only moves bytes.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::dag::{dag_to_rewritten_records, raw_records_to_dag, rewritten_records_to_dag, Dag, RawRecord};
use crate::error::IoError;
use crate::ids::Mec;
use crate::mec::MecMap;

/// Load the raw DAG format (`id`/`row_index`, `parents`/`dependency_nodes`)
/// from `path` and validate it into a [`Dag`].
pub fn load_raw_dag(path: &Path) -> Result<Dag, crate::error::Error> {
    let reader = BufReader::new(File::open(path).map_err(IoError::from)?);
    let records: Vec<RawRecord> = serde_json::from_reader(reader).map_err(IoError::from)?;
    Ok(raw_records_to_dag(records)?)
}

/// Load a previously-written rewritten DAG from `path`.
pub fn load_rewritten_dag(path: &Path) -> Result<Dag, crate::error::Error> {
    let reader = BufReader::new(File::open(path).map_err(IoError::from)?);
    let records = serde_json::from_reader(reader).map_err(IoError::from)?;
    Ok(rewritten_records_to_dag(records)?)
}

/// Write `dag` to `path` in the rewritten-DAG record format, pretty-printed
/// to match the reference generators' `json.dump(..., indent=4)`.
pub fn save_rewritten_dag(dag: &Dag, path: &Path) -> Result<(), crate::error::Error> {
    let records = dag_to_rewritten_records(dag);
    let writer = BufWriter::new(File::create(path).map_err(IoError::from)?);
    serde_json::to_writer_pretty(writer, &records).map_err(IoError::from)?;
    Ok(())
}

/// Load a MEC map from `path` (a flat `{id: mec}` object).
pub fn load_mec_map(path: &Path) -> Result<MecMap, crate::error::Error> {
    let reader = BufReader::new(File::open(path).map_err(IoError::from)?);
    let raw: std::collections::HashMap<String, u32> = serde_json::from_reader(reader).map_err(IoError::from)?;
    let map = raw
        .into_iter()
        .map(|(id, mec)| (crate::ids::NodeId::new(id), Mec(mec)))
        .collect();
    Ok(MecMap::from_map(map))
}

/// Write `mecs` to `path` as a flat `{id: mec}` object.
pub fn save_mec_map(mecs: &MecMap, path: &Path) -> Result<(), crate::error::Error> {
    let flat: std::collections::BTreeMap<String, u32> = mecs
        .iter()
        .map(|(id, mec)| (id.as_str().to_string(), mec.as_u32()))
        .collect();
    let writer = BufWriter::new(File::create(path).map_err(IoError::from)?);
    serde_json::to_writer_pretty(writer, &flat).map_err(IoError::from)?;
    Ok(())
}

/// Write `trace` to `path` as the stable `LC ... | PC ... | ...` text
/// format (see [`crate::trace`]).
pub fn save_trace(trace: &crate::trace::Trace, path: &Path) -> Result<(), crate::error::Error> {
    let mut writer = BufWriter::new(File::create(path).map_err(IoError::from)?);
    write!(writer, "{trace}").map_err(IoError::from)?;
    Ok(())
}

/// Append one `Matrix,MEC,Cycles` row to `path`, writing the header first
/// if the file does not already exist.
pub fn append_csv_summary(path: &Path, matrix: &str, max_mec: Mec, total_pc: u64) -> Result<(), crate::error::Error> {
    let exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(IoError::from)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if !exists {
        writer.write_record(["Matrix", "MEC", "Cycles"]).map_err(IoError::from)?;
    }
    writer
        .write_record([matrix, &max_mec.as_u32().to_string(), &total_pc.to_string()])
        .map_err(IoError::from)?;
    writer.flush().map_err(IoError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{Node, NodeKind};
    use crate::ids::NodeId;

    #[test]
    fn raw_dag_roundtrips_through_rewritten_format() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("raw.json");
        std::fs::write(
            &raw_path,
            r#"[{"id": "0", "parents": [], "level": 0}, {"id": "1", "parents": ["0"], "level": 1}]"#,
        )
        .unwrap();

        let dag = load_raw_dag(&raw_path).unwrap();
        assert_eq!(dag.len(), 2);

        let out_path = dir.path().join("rewritten.json");
        save_rewritten_dag(&dag, &out_path).unwrap();
        let reloaded = load_rewritten_dag(&out_path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(&NodeId::new("1")).unwrap().kind, NodeKind::Normal);
    }

    #[test]
    fn mec_map_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mec.json");
        let n0 = Node::new(NodeId::new("0"), NodeKind::Normal, vec![], 0, 1);
        let dag = Dag::from_nodes(vec![n0]).unwrap();
        let mecs = crate::mec::compile(&dag).unwrap();

        save_mec_map(&mecs, &path).unwrap();
        let reloaded = load_mec_map(&path).unwrap();
        assert_eq!(reloaded.get(&NodeId::new("0")), mecs.get(&NodeId::new("0")));
    }

    #[test]
    fn csv_summary_writes_header_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        append_csv_summary(&path, "matrix_a", Mec(5), 7).unwrap();
        append_csv_summary(&path, "matrix_b", Mec(9), 12).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Matrix,MEC,Cycles");
        assert_eq!(lines[1], "matrix_a,5,7");
        assert_eq!(lines[2], "matrix_b,9,12");
    }
}
