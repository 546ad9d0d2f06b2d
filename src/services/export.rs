use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::AppError;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Hard cap on rows written into a single export.
pub const MAX_EXPORT_ROWS: i64 = 10_000;

pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<Option<String>> for Cell {
    fn from(v: Option<String>) -> Self {
        v.map(Cell::Text).unwrap_or(Cell::Empty)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Number(v as f64)
    }
}

impl From<Option<i64>> for Cell {
    fn from(v: Option<i64>) -> Self {
        v.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

pub struct Sheet {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

pub fn to_xlsx(sheet: &Sheet) -> Result<Vec<u8>, AppError> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| AppError::internal(format!("xlsx export failed: {e}"));

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet.name).map_err(xlsx_err)?;

    let bold = Format::new().set_bold();
    for (col, title) in sheet.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *title, &bold)
            .map_err(xlsx_err)?;
    }

    for (i, row) in sheet.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Text(v) => {
                    worksheet.write_string(r, c, v.as_str()).map_err(xlsx_err)?;
                }
                Cell::Number(v) => {
                    worksheet.write_number(r, c, *v).map_err(xlsx_err)?;
                }
                Cell::Empty => {}
            }
        }
    }

    worksheet.set_freeze_panes(1, 0).map_err(xlsx_err)?;
    workbook.save_to_buffer().map_err(xlsx_err)
}

/// Wraps xlsx bytes as a download named `<stem>-<today>.xlsx`.
pub fn attachment(stem: &str, bytes: Vec<u8>) -> Response {
    let filename = format!("{}-{}.xlsx", stem, Utc::now().format("%Y-%m-%d"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_zip_container() {
        let sheet = Sheet {
            name: "Transactions",
            headers: &["GUID", "Amount", "Channel"],
            rows: vec![
                vec!["trx-1".into(), 150000.0.into(), Some("BCA_VA".to_string()).into()],
                vec!["trx-2".into(), 99000.0.into(), None::<String>.into()],
            ],
        };
        let bytes = to_xlsx(&sheet).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn attachment_headers() {
        let resp = attachment("transactions", vec![1, 2, 3]);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"transactions-"));
        assert!(disposition.ends_with(".xlsx\""));
    }
}
