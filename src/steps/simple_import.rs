//! CSV import. Sniffs the delimiter and encoding when the caller did not
//! configure them, reads each file with polars, and names the new sheets
//! from the file basenames.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;

use crate::chunks::{ChunkKind, CodeChunk};
use crate::codegen::valid_df_names_for_files;
use crate::errors::{StepError, StepResult};
use crate::params::SimpleImportParams;
use crate::sniff::{self, DEFAULT_ENCODING, FALLBACK_ENCODING};
use crate::state::{DfSource, State};
use crate::step::{invariant_mismatch, ExecutionData};

pub fn execute(
    prev_state: &State,
    params: &SimpleImportParams,
) -> StepResult<(State, ExecutionData)> {
    let file_count = params.file_names.len();
    for (name, supplied) in [
        ("delimiters", params.delimiters.as_ref().map(Vec::len)),
        ("encodings", params.encodings.as_ref().map(Vec::len)),
        ("skiprows", params.skiprows.as_ref().map(Vec::len)),
    ] {
        if supplied.is_some_and(|len| len != file_count) {
            return Err(StepError::InvalidParameter(format!(
                "{} must have one entry per file",
                name
            )));
        }
    }

    let mut delimiters = Vec::with_capacity(file_count);
    let mut encodings = Vec::with_capacity(file_count);
    let mut skiprows = Vec::with_capacity(file_count);
    let mut imported = Vec::with_capacity(file_count);
    let mut basenames = Vec::with_capacity(file_count);

    for (index, file_name) in params.file_names.iter().enumerate() {
        let path = Path::new(file_name);
        if path.is_dir() {
            return Err(StepError::IsDirectory(path.to_path_buf()));
        }
        if !path.exists() {
            return Err(StepError::FileNotFound(path.to_path_buf()));
        }

        // Sniff only when the user has not configured the import; replays
        // of configured imports must not depend on re-probing the file.
        let (delimiter, encoding) =
            match (params.delimiters.as_ref(), params.encodings.as_ref()) {
                (Some(delimiters), Some(encodings)) => (
                    delimiters[index].chars().next().unwrap_or(','),
                    encodings[index].clone(),
                ),
                _ => {
                    let probe = sniff::probe_csv(path)?;
                    (probe.delimiter, probe.encoding)
                }
            };
        let skip = params.skiprows.as_ref().map_or(0, |s| s[index]);

        imported.push(read_csv_file(path, delimiter, &encoding, skip)?);
        delimiters.push(delimiter.to_string());
        encodings.push(encoding);
        skiprows.push(skip);
        basenames.push(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.clone()),
        );
    }

    let new_df_names = valid_df_names_for_files(&prev_state.df_names, &basenames);

    let mut post_state = prev_state.clone();
    for (df, name) in imported.into_iter().zip(&new_df_names) {
        post_state.add_df_to_state(df, DfSource::Imported, Some(name.clone()), None, None);
    }

    Ok((
        post_state,
        ExecutionData::SimpleImport {
            delimiters,
            encodings,
            skiprows,
            new_df_names,
        },
    ))
}

pub fn transpile(
    prev_state: &State,
    params: &SimpleImportParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    let ExecutionData::SimpleImport {
        delimiters,
        encodings,
        skiprows,
        new_df_names,
    } = execution_data
    else {
        return Err(invariant_mismatch("simple_import"));
    };
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::SimpleImport {
            file_names: params.file_names.clone(),
            delimiters: delimiters.clone(),
            encodings: encodings.clone(),
            skiprows: skiprows.clone(),
            new_df_names: new_df_names.clone(),
        },
    )])
}

/// Reads one CSV file. Latin-1 content is decoded byte-for-byte into UTF-8
/// before handing it to the CSV parser.
fn read_csv_file(
    path: &Path,
    delimiter: char,
    encoding: &str,
    skiprows: usize,
) -> StepResult<DataFrame> {
    let mut read_options = CsvReadOptions::default();
    read_options.skip_rows = skiprows;
    read_options = read_options.map_parse_options(|opts| {
        opts.with_separator(delimiter as u8)
            .with_try_parse_dates(true)
    });

    if encoding.eq_ignore_ascii_case(DEFAULT_ENCODING) {
        let df = read_options
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?;
        Ok(df)
    } else if encoding.eq_ignore_ascii_case(FALLBACK_ENCODING) {
        let bytes = std::fs::read(path)?;
        let decoded: String = bytes.iter().map(|&b| b as char).collect();
        let df = CsvReader::new(Cursor::new(decoded.into_bytes()))
            .with_options(read_options)
            .finish()?;
        Ok(df)
    } else {
        Err(StepError::InvalidParameter(format!(
            "unsupported encoding {:?}",
            encoding
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().to_string()
    }

    fn import_params(files: Vec<String>) -> SimpleImportParams {
        SimpleImportParams {
            file_names: files,
            delimiters: None,
            encodings: None,
            skiprows: None,
        }
    }

    #[test]
    fn test_import_sniffs_semicolon_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_csv(&dir, "data.csv", "a;b\n1;2\n3;4\n");
        let prev = State::default();
        let (post, execution_data) = execute(&prev, &import_params(vec![file])).unwrap();

        assert_eq!(post.dfs.len(), 1);
        assert_eq!(post.dfs[0].height(), 2);
        assert_eq!(post.df_names, vec!["data"]);
        match execution_data {
            ExecutionData::SimpleImport { delimiters, .. } => {
                assert_eq!(delimiters, vec![";"]);
            }
            other => panic!("unexpected execution data {:?}", other),
        }
    }

    #[test]
    fn test_import_missing_file_is_typed_error() {
        let prev = State::default();
        let err = execute(
            &prev,
            &import_params(vec!["/not/a/real/file.csv".to_string()]),
        )
        .unwrap_err();
        assert!(matches!(err, StepError::FileNotFound(_)));
        // Nothing changed.
        assert!(prev.dfs.is_empty());
    }

    #[test]
    fn test_import_latin1_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // 0xE9 is 'é' in Latin-1 and invalid on its own in UTF-8.
        std::fs::write(&path, b"nom,ann\xe9e\nana,2021\n").unwrap();

        let prev = State::default();
        let params = import_params(vec![path.to_string_lossy().to_string()]);
        let (post, execution_data) = execute(&prev, &params).unwrap();
        assert_eq!(post.dfs[0].height(), 1);
        match &execution_data {
            ExecutionData::SimpleImport { encodings, .. } => {
                assert_eq!(encodings, &vec![FALLBACK_ENCODING.to_string()]);
            }
            other => panic!("unexpected execution data {:?}", other),
        }

        // The fallback encoding survives into the generated read_csv call.
        let chunks = transpile(&prev, &params, &execution_data).unwrap();
        let (lines, _) = chunks[0].code().unwrap();
        assert!(lines[0].contains("encoding='latin-1'"));
    }

    #[test]
    fn test_import_duplicate_basenames_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let subdir = dir.path().join("other");
        std::fs::create_dir(&subdir).unwrap();
        let first = write_csv(&dir, "sales.csv", "a,b\n1,2\n");
        let second = subdir.join("sales.csv");
        std::fs::write(&second, "a,b\n3,4\n").unwrap();

        let prev = State::default();
        let (post, _) = execute(
            &prev,
            &import_params(vec![first, second.to_string_lossy().to_string()]),
        )
        .unwrap();
        assert_eq!(post.df_names, vec!["sales", "sales_1"]);
    }

    #[test]
    fn test_transpile_elides_default_read_params() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_csv(&dir, "plain.csv", "a,b\n1,2\n");
        let prev = State::default();
        let params = import_params(vec![file.clone()]);
        let (_, execution_data) = execute(&prev, &params).unwrap();
        let chunks = transpile(&prev, &params, &execution_data).unwrap();
        assert_eq!(chunks.len(), 1);
        let (lines, imports) = chunks[0].code().unwrap();
        assert_eq!(lines, vec![format!("plain = pd.read_csv(r'{}')", file)]);
        assert_eq!(imports, vec!["import pandas as pd".to_string()]);
    }

    #[test]
    fn test_transpile_wrong_execution_data_is_invariant_error() {
        let prev = State::default();
        let params = import_params(vec!["x.csv".to_string()]);
        let err = transpile(&prev, &params, &ExecutionData::None).unwrap_err();
        assert!(matches!(err, StepError::TranspileInvariant(_)));
    }
}
