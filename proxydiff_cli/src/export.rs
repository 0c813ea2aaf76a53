use chrono::Local;
use clap::ValueEnum;
use proxydiff_common::{
    ComparisonResult, FileEntry, FrameMismatch, ProxydiffError, Result, ScanMode,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// UTF-8 BOM, written ahead of CSV and HTML output so spreadsheet and
/// browser imports detect the encoding.
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Txt,
    Json,
    Csv,
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }
}

/// Write the comparison result to `output` in the requested format.
pub fn write_report(
    result: &ComparisonResult,
    format: ExportFormat,
    output: &Path,
) -> Result<()> {
    match format {
        ExportFormat::Txt => write_txt(result, output),
        ExportFormat::Json => write_json(result, output),
        ExportFormat::Csv => write_csv(result, output),
        ExportFormat::Html => write_html(result, output),
    }
}

fn display_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

fn combined_path(paths: &[PathBuf]) -> String {
    display_paths(paths).join(" + ")
}

#[derive(Serialize)]
struct JsonReport<'a> {
    mode: ScanMode,
    comparison_time: String,
    group1: JsonGroup,
    group2: JsonGroup,
    files_only_in_group1: &'a [FileEntry],
    files_only_in_group2: &'a [FileEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_count_mismatches: Option<&'a [FrameMismatch]>,
    conflicts: JsonConflicts,
}

#[derive(Serialize)]
struct JsonGroup {
    directories: Vec<String>,
    combined_path: String,
}

#[derive(Serialize)]
struct JsonConflicts {
    group1: usize,
    group2: usize,
}

fn write_json(result: &ComparisonResult, output: &Path) -> Result<()> {
    let report = JsonReport {
        mode: result.mode,
        comparison_time: Local::now().to_rfc3339(),
        group1: JsonGroup {
            directories: display_paths(&result.group1_paths),
            combined_path: combined_path(&result.group1_paths),
        },
        group2: JsonGroup {
            directories: display_paths(&result.group2_paths),
            combined_path: combined_path(&result.group2_paths),
        },
        files_only_in_group1: &result.unique_to_group1,
        files_only_in_group2: &result.unique_to_group2,
        frame_count_mismatches: (result.mode == ScanMode::ProxyAdvanced)
            .then_some(result.mismatches.as_slice()),
        conflicts: JsonConflicts {
            group1: result.group1_conflicts.len(),
            group2: result.group2_conflicts.len(),
        },
    };

    let data = serde_json::to_string_pretty(&report)
        .map_err(|e| ProxydiffError::Serialization(e.to_string()))?;
    std::fs::write(output, data)?;
    Ok(())
}

fn write_group_txt(
    out: &mut impl Write,
    label: &str,
    paths: &[PathBuf],
    entries: &[FileEntry],
) -> std::io::Result<()> {
    writeln!(out, "Files only in {label}:")?;
    if paths.len() > 1 {
        writeln!(out, "Directories:")?;
        for path in paths {
            writeln!(out, "  - {}", path.display())?;
        }
    } else if let Some(path) = paths.first() {
        writeln!(out, "Directory: {}", path.display())?;
    }
    writeln!(out, "({} files):", entries.len())?;
    for entry in entries {
        writeln!(out, "{}", entry.path.display())?;
    }
    Ok(())
}

fn write_txt(result: &ComparisonResult, output: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(output)?);

    writeln!(out, "File Comparison Results")?;
    writeln!(out, "Mode: {}", result.mode)?;
    writeln!(out, "Time: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"))?;

    write_group_txt(&mut out, "first group", &result.group1_paths, &result.unique_to_group1)?;
    writeln!(out)?;
    write_group_txt(&mut out, "second group", &result.group2_paths, &result.unique_to_group2)?;

    if result.mode == ScanMode::ProxyAdvanced {
        writeln!(out, "\n{}", "=".repeat(80))?;
        writeln!(
            out,
            "FRAME COUNT MISMATCHES ({} files)",
            result.mismatches.len()
        )?;
        writeln!(out, "{}\n", "=".repeat(80))?;
        for mismatch in &result.mismatches {
            writeln!(out, "Basename: {}", mismatch.key)?;
            writeln!(out, "  Group 1: {} ({} frames)", mismatch.filename1, mismatch.frames1)?;
            writeln!(out, "  Group 2: {} ({} frames)", mismatch.filename2, mismatch.frames2)?;
            writeln!(out, "  Difference: {} frames", mismatch.difference)?;
            writeln!(out, "  Path 1: {}", mismatch.path1.display())?;
            writeln!(out, "  Path 2: {}\n", mismatch.path2.display())?;
        }
    }

    let conflict_total = result.group1_conflicts.len() + result.group2_conflicts.len();
    if conflict_total > 0 {
        writeln!(
            out,
            "\nConflicts (first occurrence kept): {} in group 1, {} in group 2",
            result.group1_conflicts.len(),
            result.group2_conflicts.len()
        )?;
    }

    out.flush()?;
    Ok(())
}

fn write_csv(result: &ComparisonResult, output: &Path) -> Result<()> {
    let mut file = File::create(output)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    let to_export =
        |e: csv::Error| ProxydiffError::Export(e.to_string());

    writer
        .write_record(["Mode", result.mode.as_str()])
        .map_err(to_export)?;
    let time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    writer
        .write_record(["Time", time.as_str()])
        .map_err(to_export)?;
    writer.write_record([""]).map_err(to_export)?;

    let mut group1_row = vec!["Group 1 Directories".to_string()];
    group1_row.extend(display_paths(&result.group1_paths));
    writer.write_record(&group1_row).map_err(to_export)?;

    let mut group2_row = vec!["Group 2 Directories".to_string()];
    group2_row.extend(display_paths(&result.group2_paths));
    writer.write_record(&group2_row).map_err(to_export)?;
    writer.write_record([""]).map_err(to_export)?;

    writer.write_record(["Location", "Path"]).map_err(to_export)?;
    for entry in &result.unique_to_group1 {
        writer
            .write_record(["Group1", entry.path.display().to_string().as_str()])
            .map_err(to_export)?;
    }
    for entry in &result.unique_to_group2 {
        writer
            .write_record(["Group2", entry.path.display().to_string().as_str()])
            .map_err(to_export)?;
    }

    if result.mode == ScanMode::ProxyAdvanced && !result.mismatches.is_empty() {
        writer.write_record([""]).map_err(to_export)?;
        writer
            .write_record(["FRAME COUNT MISMATCHES"])
            .map_err(to_export)?;
        writer
            .write_record([
                "Basename",
                "File (Group 1)",
                "Frames (Group 1)",
                "File (Group 2)",
                "Frames (Group 2)",
                "Difference",
                "Path 1",
                "Path 2",
            ])
            .map_err(to_export)?;
        for mismatch in &result.mismatches {
            writer
                .write_record([
                    mismatch.key.clone(),
                    mismatch.filename1.clone(),
                    mismatch.frames1.to_string(),
                    mismatch.filename2.clone(),
                    mismatch.frames2.to_string(),
                    mismatch.difference.to_string(),
                    mismatch.path1.display().to_string(),
                    mismatch.path2.display().to_string(),
                ])
                .map_err(to_export)?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const HTML_STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
            margin: 20px;
            line-height: 1.5;
            color: #333;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            margin-top: 10px;
            margin-bottom: 40px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 12px;
            text-align: left;
        }
        th {
            background-color: #f2f2f2;
            font-weight: 600;
        }
        .path1 { background-color: #ffeeee; }
        .path2 { background-color: #bfe1f7; }
        .mismatch { background-color: #fff3cd; }
        .path-header {
            background-color: #f8f9fa;
            padding: 20px;
            border-radius: 6px;
            margin: 30px 0;
            border: 1px solid #ddd;
        }
        .path-text {
            background-color: #fff;
            padding: 10px;
            border-radius: 4px;
            border: 1px solid #ddd;
            word-break: break-all;
            margin-bottom: 5px;
        }
        .section { margin-bottom: 40px; }
        .mode-info {
            background-color: #e9ecef;
            padding: 10px 20px;
            border-radius: 4px;
            margin-bottom: 20px;
            border: 1px solid #dee2e6;
            display: inline-block;
        }
        .warning-box {
            background-color: #fff3cd;
            border: 1px solid #ffc107;
            border-radius: 6px;
            padding: 20px;
            margin: 30px 0;
        }
        .ok-box {
            background-color: #d4edda;
            border: 1px solid #c3e6cb;
            border-radius: 6px;
            padding: 20px;
            margin: 30px 0;
        }
"#;

fn mode_description(mode: ScanMode) -> &'static str {
    match mode {
        ScanMode::Normal => "Normal (comparing all files by basename.extension)",
        ScanMode::Proxy => "Proxy (comparing video files by basename only)",
        ScanMode::ProxyAdvanced => {
            "Proxy Advanced (comparing video files by basename and frame count)"
        }
    }
}

fn html_dir_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("<div class=\"path-text\">{}</div>", escape_html(&p.display().to_string())))
        .collect()
}

fn html_file_rows(entries: &[FileEntry], class: &str) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "<tr class=\"{class}\"><td>{}</td></tr>\n",
                escape_html(&e.path.display().to_string())
            )
        })
        .collect()
}

fn html_mismatch_section(result: &ComparisonResult) -> String {
    if result.mode != ScanMode::ProxyAdvanced {
        return String::new();
    }

    if result.mismatches.is_empty() {
        return "<div class=\"section\">\n<div class=\"ok-box\">\n\
                <h3>Frame Count Mismatches (0 files)</h3>\n\
                <p><strong>ALL</strong> files have matching frame counts</p>\n\
                </div>\n</div>\n"
            .to_string();
    }

    let rows: String = result
        .mismatches
        .iter()
        .map(|m| {
            format!(
                "<tr class=\"mismatch\"><td>{}</td><td>{}</td><td>{}</td>\
                 <td>{}</td><td>{}</td><td><strong>{}</strong></td></tr>\n",
                escape_html(&m.key),
                escape_html(&m.filename1),
                m.frames1,
                escape_html(&m.filename2),
                m.frames2,
                m.difference
            )
        })
        .collect();

    format!(
        "<div class=\"section\">\n<div class=\"warning-box\">\n\
         <h3>Frame Count Mismatches ({} files)</h3>\n\
         <p>These files exist in both groups but have different frame counts, \
         indicating incomplete or corrupted proxy files:</p>\n</div>\n\
         <table>\n<tr><th>Basename</th><th>File (Group 1)</th><th>Frames (Group 1)</th>\
         <th>File (Group 2)</th><th>Frames (Group 2)</th><th>Difference</th></tr>\n\
         {rows}</table>\n</div>\n",
        result.mismatches.len()
    )
}

fn write_html(result: &ComparisonResult, output: &Path) -> Result<()> {
    let content = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>File Comparison Results</title>
    <style>{style}</style>
</head>
<body>
    <h2>File Comparison Results</h2>
    <div class="mode-info">
        <strong>Mode:</strong> {mode}<br>
        <strong>Time:</strong> {time}
    </div>

    {mismatches}

    <div class="section">
        <div class="path-header">
            <h3>Files only in first group: ({count1} files)</h3>
            {dirs1}
        </div>
        <table>
            <tr><th>File Path</th></tr>
            {rows1}
        </table>
    </div>

    <div class="section">
        <div class="path-header">
            <h3>Files only in second group: ({count2} files)</h3>
            {dirs2}
        </div>
        <table>
            <tr><th>File Path</th></tr>
            {rows2}
        </table>
    </div>
</body>
</html>"#,
        style = HTML_STYLE,
        mode = mode_description(result.mode),
        time = Local::now().format("%Y-%m-%d %H:%M:%S"),
        mismatches = html_mismatch_section(result),
        count1 = result.unique_to_group1.len(),
        dirs1 = html_dir_list(&result.group1_paths),
        rows1 = html_file_rows(&result.unique_to_group1, "path1"),
        count2 = result.unique_to_group2.len(),
        dirs2 = html_dir_list(&result.group2_paths),
        rows2 = html_file_rows(&result.unique_to_group2, "path2"),
    );

    let mut file = File::create(output)?;
    file.write_all(UTF8_BOM)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxydiff_common::Conflict;
    use tempfile::TempDir;

    fn entry(key: &str, path: &str, frames: Option<u64>) -> FileEntry {
        FileEntry {
            key: key.to_string(),
            path: PathBuf::from(path),
            filename: Path::new(path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string(),
            frame_count: frames,
        }
    }

    fn sample_result(mode: ScanMode) -> ComparisonResult {
        ComparisonResult {
            mode,
            group1_paths: vec![PathBuf::from("/media/originals")],
            group2_paths: vec![PathBuf::from("/media/proxies"), PathBuf::from("/media/extra")],
            unique_to_group1: vec![entry("x", "/media/originals/x.mp4", None)],
            unique_to_group2: vec![entry("z", "/media/proxies/z.mov", None)],
            mismatches: vec![FrameMismatch {
                key: "y".to_string(),
                path1: PathBuf::from("/media/originals/y.mov"),
                path2: PathBuf::from("/media/proxies/y.mp4"),
                filename1: "y.mov".to_string(),
                filename2: "y.mp4".to_string(),
                frames1: 120,
                frames2: 100,
                difference: 20,
            }],
            group1_conflicts: vec![Conflict {
                key: "x".to_string(),
                existing_path: PathBuf::from("/media/originals/x.mp4"),
                new_path: PathBuf::from("/media/extra/x.mp4"),
            }],
            group2_conflicts: Vec::new(),
        }
    }

    #[test]
    fn json_report_has_expected_shape() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("report.json");
        write_report(&sample_result(ScanMode::ProxyAdvanced), ExportFormat::Json, &out).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["mode"], "proxy_advanced");
        assert_eq!(value["files_only_in_group1"][0]["key"], "x");
        assert_eq!(value["files_only_in_group2"][0]["key"], "z");
        assert_eq!(value["frame_count_mismatches"][0]["difference"], 20);
        assert_eq!(value["conflicts"]["group1"], 1);
        assert_eq!(
            value["group2"]["combined_path"],
            "/media/proxies + /media/extra"
        );
    }

    #[test]
    fn json_report_omits_mismatches_outside_advanced_mode() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("report.json");
        write_report(&sample_result(ScanMode::Proxy), ExportFormat::Json, &out).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert!(value.get("frame_count_mismatches").is_none());
    }

    #[test]
    fn txt_report_lists_files_and_mismatches() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("report.txt");
        write_report(&sample_result(ScanMode::ProxyAdvanced), ExportFormat::Txt, &out).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("Mode: proxy_advanced"));
        assert!(text.contains("/media/originals/x.mp4"));
        assert!(text.contains("Basename: y"));
        assert!(text.contains("Difference: 20 frames"));
        assert!(text.contains("Conflicts (first occurrence kept): 1 in group 1, 0 in group 2"));
    }

    #[test]
    fn csv_report_starts_with_bom_and_contains_rows() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("report.csv");
        write_report(&sample_result(ScanMode::ProxyAdvanced), ExportFormat::Csv, &out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.contains("Group1,/media/originals/x.mp4"));
        assert!(text.contains("FRAME COUNT MISMATCHES"));
    }

    #[test]
    fn html_report_escapes_paths() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("report.html");

        let mut result = sample_result(ScanMode::Proxy);
        result.unique_to_group1 =
            vec![entry("a<b", "/media/originals/a<b>.mp4", None)];
        write_report(&result, ExportFormat::Html, &out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.contains("a&lt;b&gt;.mp4"));
        assert!(!text.contains("a<b>.mp4"));
        // No mismatch section outside advanced mode
        assert!(!text.contains("Frame Count Mismatches"));
    }

    #[test]
    fn html_report_renders_all_clear_state() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("report.html");

        let mut result = sample_result(ScanMode::ProxyAdvanced);
        result.mismatches.clear();
        write_report(&result, ExportFormat::Html, &out).unwrap();

        let text = String::from_utf8_lossy(&std::fs::read(&out).unwrap()).to_string();
        assert!(text.contains("Frame Count Mismatches (0 files)"));
        assert!(text.contains("matching frame counts"));
    }

    #[test]
    fn extensions_match_formats() {
        assert_eq!(ExportFormat::Txt.extension(), "txt");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Html.extension(), "html");
    }
}
