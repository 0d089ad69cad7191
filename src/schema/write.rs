use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use std::{fs, path::Path};
use tracing::info;

use super::Schema;

const COLUMN_WIDTH: f64 = 20.0;

/// Upper-case the first letter of each word, lower-case the rest.
fn title_case(label: &str) -> String {
    label
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Header row of the blank template: the title-cased label of every mapped field.
pub fn template_headers(schema: &Schema) -> Vec<String> {
    schema
        .mapped_fields()
        .map(|f| title_case(&f.label))
        .collect()
}

/// Build the blank XLSX template for `schema` in memory.
///
/// - one sheet named `<sheet_title> Template`
/// - one bold header row, no data rows
pub fn write_template(schema: &Schema, sheet_title: &str) -> Result<Vec<u8>> {
    let headers = template_headers(schema);
    let bold = Format::new().set_bold();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(format!("{} Template", sheet_title))
        .context("naming template sheet")?;

    for (col, header) in headers.iter().enumerate() {
        let col = u16::try_from(col).context("too many template columns")?;
        sheet
            .write_string_with_format(0, col, header, &bold)
            .with_context(|| format!("writing header `{}`", header))?;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
    }

    workbook
        .save_to_buffer()
        .context("serializing template workbook")
}

/// Write the template to `path`, replacing any existing file.
pub fn save_template<P: AsRef<Path>>(schema: &Schema, sheet_title: &str, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = write_template(schema, sheet_title)?;

    // write to a sibling tmp file, then rename over the target
    let tmp_path = path.with_extension("xlsx.tmp");
    fs::write(&tmp_path, &bytes).with_context(|| format!("writing {:?}", tmp_path))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;

    info!(path = %path.display(), columns = schema.mapped_fields().count(), "wrote template");
    Ok(())
}
