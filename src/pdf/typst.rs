use std::path::Path;
use std::process::Command;

use super::build_payload;
use crate::config::CompanySettings;
use crate::error::{ReportError, Result};
use crate::render::{NumberFormat, ReportDocument};

/// Embedded Typst template for paged reports.
/// Every block is placed at the position computed by the layout pass.
const REPORT_TEMPLATE: &str = r##"// Sales Report Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")
#let mm(v) = v * 1mm
#let accent = rgb("#2563eb")
#let palette = (
  rgb("#2563eb"), rgb("#16a34a"), rgb("#f59e0b"), rgb("#dc2626"),
  rgb("#7c3aed"), rgb("#0891b2"), rgb("#db2777"), rgb("#64748b"),
)

#set page(width: mm(data.page_width), height: mm(data.page_height), margin: 0pt)
#set text(font: "Helvetica", size: 8pt, lang: "fr")

#let section-title(title) = block(
  height: mm(data.title_height), above: 0pt, below: 0pt,
  text(size: 11pt, weight: "bold", fill: rgb("#1e293b"), title),
)

#let placeholder() = text(fill: gray, style: "italic", data.placeholder)

#let text-block(b) = {
  if b.title != none { section-title(b.title) }
  if b.heading {
    text(size: 16pt, weight: "bold", fill: accent, b.lines.join(" "))
    if b.subtitle != none {
      linebreak()
      text(size: 8pt, fill: gray, b.subtitle)
    }
  } else {
    for line in b.lines {
      block(height: mm(data.text_line_height), above: 0pt, below: 0pt, line)
    }
  }
}

#let kpi-block(b) = {
  section-title(b.title)
  if b.tiles.len() == 0 {
    placeholder()
  } else {
    grid(
      columns: (1fr,) * data.kpi_columns,
      rows: mm(data.kpi_row_height),
      column-gutter: 2mm,
      ..b.tiles.map(t => box(
        width: 100%, height: mm(data.kpi_row_height - 3),
        inset: (x: 3mm, y: 2mm), fill: luma(245), radius: 2pt,
        stack(
          spacing: 2mm,
          text(size: 7pt, fill: gray, t.label),
          text(size: 12pt, weight: "bold", t.value),
        ),
      ))
    )
  }
}

#let bar-block(b) = {
  section-title(b.title)
  if b.points.len() == 0 {
    placeholder()
  } else {
    let plot = mm(data.chart_height - 12)
    grid(
      columns: (1fr,) * b.points.len(),
      rows: (4mm, plot, 6mm),
      column-gutter: 1mm,
      align: center + bottom,
      ..b.points.map(p => text(size: 5pt, p.value)),
      ..b.points.map(p => rect(width: 80%, height: plot * p.ratio, fill: accent)),
      ..b.points.map(p => text(size: 5pt, p.label)),
    )
  }
}

#let pie-block(b) = {
  section-title(b.title)
  if b.points.len() == 0 {
    placeholder()
  } else {
    grid(
      columns: (40mm, 1fr, 24mm, 14mm),
      row-gutter: 2mm,
      column-gutter: 2mm,
      align: (left + horizon, left + horizon, right + horizon, right + horizon),
      ..b.points.enumerate().map(((i, p)) => (
        text(size: 7pt, p.label),
        rect(width: 100% * p.ratio, height: 4mm, fill: palette.at(calc.rem(i, palette.len()))),
        text(size: 7pt, p.value),
        text(size: 7pt, weight: "bold", p.percent),
      )).flatten()
    )
  }
}

#let table-block(b) = {
  if b.title != none { section-title(b.title) }
  table(
    columns: (1fr,) * b.columns.len(),
    rows: (mm(data.table_header_height), mm(data.table_row_height)),
    inset: (x: 2mm, y: 0pt),
    align: (x, y) => if y > 0 and b.numeric.at(x) { right + horizon } else { left + horizon },
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { (bottom: 0.5pt + luma(200)) },
    fill: (x, y) => if y == 0 { luma(240) } else { none },

    // Header, repeated on continuation pages
    ..b.columns.map(c => text(weight: "bold", c)),

    ..if b.rows.len() == 0 {
      (table.cell(colspan: b.columns.len(), placeholder()),)
    } else {
      b.rows.flatten()
    }
  )
}

#let render-block(b) = {
  if b.kind == "text" {
    text-block(b)
  } else if b.kind == "kpis" {
    kpi-block(b)
  } else if b.kind == "bar" {
    bar-block(b)
  } else if b.kind == "pie" {
    pie-block(b)
  } else {
    table-block(b)
  }
}

#for (i, page) in data.pages.enumerate() {
  if i > 0 { pagebreak() }
  for b in page.blocks {
    place(top + left, dx: mm(data.margin), dy: mm(b.y), block(
      width: mm(data.content_width),
      height: mm(b.height),
      render-block(b),
    ))
  }
  place(bottom + left, dx: mm(data.margin), dy: -mm(data.margin / 2), box(
    width: mm(data.content_width),
    grid(
      columns: (1fr, auto),
      text(size: 7pt, fill: gray, data.footer),
      text(size: 7pt, fill: gray, "Page " + str(page.number) + " / " + str(page.total)),
    ),
  ))
}
"##;

/// Generate PDF using Typst CLI
pub fn generate_pdf(
    doc: &ReportDocument,
    fmt: &NumberFormat,
    company: &CompanySettings,
    output_path: &Path,
) -> Result<()> {
    // Check if typst is available
    let typst_check = Command::new("typst").arg("--version").output();

    if typst_check.is_err() {
        return Err(ReportError::TypstNotFound);
    }

    let temp_dir = std::env::temp_dir().join(format!("salesreport-{}", std::process::id()));
    std::fs::create_dir_all(&temp_dir)?;

    let payload = build_payload(doc, fmt, company);
    let json_data =
        serde_json::to_string(&payload).map_err(|e| ReportError::PdfGeneration(e.to_string()))?;

    let json_path = temp_dir.join("report_data.json");
    std::fs::write(&json_path, &json_data)?;

    // Template reads the JSON relative to the --root directory
    let template_content = REPORT_TEMPLATE.replace("DATA_JSON_PATH", "report_data.json");
    let template_path = temp_dir.join("report.typ");
    std::fs::write(&template_path, &template_content)?;

    tracing::debug!(
        pages = payload.pages.len(),
        template = %template_path.display(),
        "compiling report with typst"
    );

    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(&temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    let _ = std::fs::remove_dir_all(&temp_dir);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReportError::PdfGeneration(stderr.to_string()));
    }

    tracing::info!(path = %output_path.display(), "pdf written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_reads_the_payload_file() {
        let content = REPORT_TEMPLATE.replace("DATA_JSON_PATH", "report_data.json");
        assert!(content.contains(r#"json("report_data.json")"#));
        assert!(!content.contains("DATA_JSON_PATH"));
    }
}
