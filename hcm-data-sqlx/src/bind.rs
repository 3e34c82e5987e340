use hcm_data::DataError;
use hcm_filter::SqlArg;
use sqlx::any::AnyArguments;
use sqlx::Arguments;

/// Convert bound values into driver arguments, preserving order.
pub(crate) fn to_arguments<'q>(args: Vec<SqlArg>) -> Result<AnyArguments<'q>, DataError> {
    let mut out = AnyArguments::default();
    for arg in args {
        let added = match arg {
            SqlArg::Null => out.add(Option::<String>::None),
            SqlArg::Bool(b) => out.add(b),
            SqlArg::Int(i) => out.add(i),
            SqlArg::Float(f) => out.add(f),
            SqlArg::Text(s) => out.add(s),
        };
        added.map_err(|e| DataError::Other(format!("bind argument failed, err: {e}")))?;
    }
    Ok(out)
}
