use mysql_async::Value as MyValue;
use rayon::prelude::*;

pub type SQLtuple = (String, Vec<MyValue>);

/// Returns a tuple with a string containing comma-separated question marks, and the (non-empty) Vec elements
pub fn prep_quote(strings: &[String]) -> SQLtuple {
    let escaped: Vec<MyValue> = strings
        .par_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| MyValue::Bytes(s.into()))
        .collect();
    (get_placeholders(escaped.len()), escaped)
}

/// Generates a string with `len` comma-separated question marks
pub fn get_placeholders(len: usize) -> String {
    let mut questionmarks: Vec<String> = Vec::new();
    questionmarks.resize(len, "?".to_string());
    questionmarks.join(",")
}

/// Appends `sub` (both SQL string and parameters) onto `sql`
pub fn append_sql(sql: &mut SQLtuple, mut sub: SQLtuple) {
    sql.0 += &sub.0;
    sql.1.append(&mut sub.1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prep_quote_basic() {
        let strings = vec!["foo".to_string(), "bar".to_string(), "baz".to_string()];
        let (placeholders, values) = prep_quote(&strings);
        assert_eq!(placeholders, "?,?,?");
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], MyValue::Bytes("foo".into()));
    }

    #[test]
    fn test_prep_quote_empty_filtered() {
        let strings = vec![
            "foo".to_string(),
            "".to_string(),
            "  ".to_string(),
            " bar ".to_string(),
        ];
        let (placeholders, values) = prep_quote(&strings);
        assert_eq!(placeholders, "?,?");
        assert_eq!(values[1], MyValue::Bytes("bar".into()));
    }

    #[test]
    fn test_prep_quote_empty_input() {
        let (placeholders, values) = prep_quote(&[]);
        assert_eq!(placeholders, "");
        assert!(values.is_empty());
    }

    #[test]
    fn test_get_placeholders() {
        assert_eq!(get_placeholders(0), "");
        assert_eq!(get_placeholders(1), "?");
        assert_eq!(get_placeholders(4), "?,?,?,?");
    }

    #[test]
    fn test_append_sql() {
        let mut sql = ("SELECT wiki_dbname FROM cw_wikis WHERE ".to_string(), vec![]);
        append_sql(
            &mut sql,
            (
                "wiki_dbname=?".to_string(),
                vec![MyValue::Bytes("metawiki".into())],
            ),
        );
        assert_eq!(sql.0, "SELECT wiki_dbname FROM cw_wikis WHERE wiki_dbname=?");
        assert_eq!(sql.1.len(), 1);

        append_sql(&mut sql, (String::new(), vec![]));
        assert_eq!(sql.1.len(), 1);
    }
}
