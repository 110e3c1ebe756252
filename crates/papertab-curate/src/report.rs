//! CuratedReportWriter: JSON Lines dataset plus a bounded HTML preview

use std::fmt::Write as _;
use std::io::{self, Write};

use quick_xml::escape::escape;

use crate::record::Paper;

pub const DEFAULT_PREVIEW_LIMIT: usize = 100;
pub const DEFAULT_LINK_TEMPLATE: &str = "https://arxiv.org/pdf/{id}.pdf";

/// Placeholder substituted with the paper id in the link template
const ID_PLACEHOLDER: &str = "{id}";

/// Outcome of a finished report
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub papers_written: usize,
    pub papers_previewed: usize,
    pub tables_written: usize,
    /// Complete preview document (`<body>...</body>`)
    pub preview: String,
}

pub struct CuratedReportWriter<W: Write> {
    out: W,
    preview: String,
    preview_limit: usize,
    link_template: String,
    papers_written: usize,
    papers_previewed: usize,
    tables_written: usize,
}

impl<W: Write> CuratedReportWriter<W> {
    pub fn new(out: W, preview_limit: usize, link_template: impl Into<String>) -> Self {
        Self {
            out,
            preview: String::from("<body>"),
            preview_limit,
            link_template: link_template.into(),
            papers_written: 0,
            papers_previewed: 0,
            tables_written: 0,
        }
    }

    pub fn with_defaults(out: W) -> Self {
        Self::new(out, DEFAULT_PREVIEW_LIMIT, DEFAULT_LINK_TEMPLATE)
    }

    /// Append one record to the dataset; the first `preview_limit`
    /// records also go into the preview.
    pub fn write_paper(&mut self, paper: &Paper) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, paper).map_err(io::Error::from)?;
        self.out.write_all(b"\n")?;
        self.papers_written += 1;
        self.tables_written += paper.tables.len();

        if self.papers_previewed < self.preview_limit {
            self.append_preview(paper);
            self.papers_previewed += 1;
        }
        Ok(())
    }

    fn append_preview(&mut self, paper: &Paper) {
        let link = self.link_template.replace(ID_PLACEHOLDER, &paper.paper_id);
        let link = escape(link.as_str());
        let _ = write!(
            self.preview,
            "<div><p><a href=\"{link}\"><h2>{link}</h2></a></p>"
        );
        for (_, table) in paper.tables.iter() {
            if let Some(html) = &table.html_table {
                self.preview.push_str(html);
                self.preview.push_str("\n<hr>");
            }
        }
        self.preview.push_str("</div>\n");
    }

    /// Flush the dataset and close the preview document.
    pub fn finish(mut self) -> io::Result<Report> {
        self.out.flush()?;
        self.preview.push_str("</body>");
        Ok(Report {
            papers_written: self.papers_written,
            papers_previewed: self.papers_previewed,
            tables_written: self.tables_written,
            preview: self.preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Table;

    fn paper(id: &str) -> Paper {
        let mut table = Table::new("<table/>");
        table.html_table = Some("<table></table>".into());
        Paper::new(id).with_table("t1", table)
    }

    #[test]
    fn writes_one_line_per_paper() {
        let mut buf = Vec::new();
        let mut writer = CuratedReportWriter::with_defaults(&mut buf);
        writer.write_paper(&paper("a")).unwrap();
        writer.write_paper(&paper("b")).unwrap();
        let report = writer.finish().unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Paper = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.paper_id, "a");
        assert_eq!(report.papers_written, 2);
        assert_eq!(report.tables_written, 2);
    }

    #[test]
    fn preview_fragment_layout() {
        let mut writer = CuratedReportWriter::with_defaults(io::sink());
        writer.write_paper(&paper("2310.00001")).unwrap();
        let report = writer.finish().unwrap();
        assert_eq!(
            report.preview,
            "<body><div><p><a href=\"https://arxiv.org/pdf/2310.00001.pdf\">\
             <h2>https://arxiv.org/pdf/2310.00001.pdf</h2></a></p>\
             <table></table>\n<hr></div>\n</body>"
        );
    }

    #[test]
    fn preview_is_bounded() {
        let mut writer = CuratedReportWriter::new(io::sink(), 2, "{id}");
        for id in ["a", "b", "c"] {
            writer.write_paper(&paper(id)).unwrap();
        }
        let report = writer.finish().unwrap();
        assert_eq!(report.papers_written, 3);
        assert_eq!(report.papers_previewed, 2);
        assert!(report.preview.contains("<h2>b</h2>"));
        assert!(!report.preview.contains("<h2>c</h2>"));
    }

    #[test]
    fn zero_limit_gives_empty_preview() {
        let mut writer = CuratedReportWriter::new(io::sink(), 0, "{id}");
        writer.write_paper(&paper("a")).unwrap();
        assert_eq!(writer.finish().unwrap().preview, "<body></body>");
    }
}
