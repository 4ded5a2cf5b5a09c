//! Reading account requests from CSV.
//!
//! The header row must start with `firstname,lastname`. `customfield` and
//! `password` columns are picked up by name wherever they appear. Every other
//! column is passed along to `suggest` under its header name, for username
//! patterns that refer to it. Rows without a password get the default one.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use provisioner_common::types::AccountRequest;
use smol_str::SmolStr;

/// Problems with the tabular input itself, as opposed to individual rows.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TabularError {
    /// The input could not be read or is not valid CSV
    #[error("failed to read CSV: {0}")]
    #[diagnostic(code(provisioner::tabular::csv))]
    Csv(#[from] csv::Error),

    /// Header present but no data rows
    #[error("the file contains no data rows")]
    #[diagnostic(code(provisioner::tabular::no_rows))]
    NoRows,

    /// Header has fewer than two columns
    #[error("the header has {0} column(s), at least 2 are required")]
    #[diagnostic(
        code(provisioner::tabular::missing_columns),
        help("the first two columns must be `firstname` and `lastname`")
    )]
    MissingColumns(usize),

    /// First two header columns are not `firstname`, `lastname`
    #[error("expected header `firstname,lastname`, found `{first},{second}`")]
    #[diagnostic(
        code(provisioner::tabular::wrong_header),
        help("the first two columns must be `firstname` and `lastname`, in that order")
    )]
    WrongHeader {
        /// First header cell as found
        first: String,
        /// Second header cell as found
        second: String,
    },
}

// columns with a fixed meaning, never forwarded as extra fields
const RESERVED: [&str; 4] = ["firstname", "lastname", "customfield", "password"];

struct Columns {
    custom_field: Option<usize>,
    password: Option<usize>,
    extra: Vec<(usize, SmolStr)>,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self, TabularError> {
        if header.len() < 2 {
            return Err(TabularError::MissingColumns(header.len()));
        }
        let (first, second) = (&header[0], &header[1]);
        if first != "firstname" || second != "lastname" {
            return Err(TabularError::WrongHeader {
                first: first.to_owned(),
                second: second.to_owned(),
            });
        }
        let extra = header
            .iter()
            .enumerate()
            .skip(2)
            .filter(|(_, h)| !h.is_empty() && !RESERVED.contains(h))
            .map(|(i, h)| (i, SmolStr::new(h)))
            .collect();
        Ok(Self {
            custom_field: header.iter().position(|h| h == "customfield"),
            password: header.iter().position(|h| h == "password"),
            extra,
        })
    }
}

/// Parse every data row of `reader` into an [`AccountRequest`].
///
/// Rows with empty names are kept; the workflow reports them as skipped.
pub fn read_requests<R: Read>(
    reader: R,
    default_password: &str,
) -> Result<Vec<AccountRequest>, TabularError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_header(rdr.headers()?)?;

    let mut requests = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).filter(|c| !c.is_empty());

        let password = cell(columns.password).unwrap_or(default_password);
        let extra_fields: BTreeMap<SmolStr, SmolStr> = columns
            .extra
            .iter()
            .filter_map(|(i, name)| record.get(*i).map(|v| (name.clone(), SmolStr::new(v))))
            .collect();
        requests.push(AccountRequest {
            first_name: SmolStr::new(record.get(0).unwrap_or_default()),
            last_name: SmolStr::new(record.get(1).unwrap_or_default()),
            custom_field: cell(columns.custom_field).map(SmolStr::new),
            password: SmolStr::new(password),
            extra_fields,
        });
    }

    if requests.is_empty() {
        return Err(TabularError::NoRows);
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(rows = requests.len(), "read account requests");
    Ok(requests)
}

/// [`read_requests`] over a file on disk.
pub fn from_path(
    path: impl AsRef<Path>,
    default_password: &str,
) -> Result<Vec<AccountRequest>, TabularError> {
    let file = File::open(path.as_ref()).map_err(csv::Error::from)?;
    read_requests(file, default_password)
}
