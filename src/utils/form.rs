use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};

use crate::error::AppError;

/// URL-encoded form payload that keeps repeated keys, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pairs: Vec<(String, String)>,
}

impl FormValues {
    pub fn parse(body: &[u8]) -> Self {
        url::form_urlencoded::parse(body).into_owned().collect()
    }

    /// First value for `key`, or the empty string when absent.
    pub fn get(&self, key: &str) -> &str {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Yields `(suffix, value)` for every key starting with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.pairs.iter().filter_map(move |(name, value)| {
            name.strip_prefix(prefix)
                .map(|suffix| (suffix, value.as_str()))
        })
    }

    /// HTML checkbox semantics.
    pub fn is_checked(&self, key: &str) -> bool {
        self.get(key) == "on"
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormValues
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::bad_request("Error al procesar el formulario."))?;
        Ok(Self::parse(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::FormValues;

    #[test]
    fn keeps_repeated_keys() {
        let form = FormValues::parse(b"standard_software=1&standard_software=3&ticket_name=T%2D1");
        assert_eq!(form.get_all("standard_software").collect::<Vec<_>>(), vec!["1", "3"]);
        assert_eq!(form.get("ticket_name"), "T-1");
    }

    #[test]
    fn missing_keys_read_as_empty() {
        let form = FormValues::parse(b"a=1");
        assert_eq!(form.get("b"), "");
        assert_eq!(form.get_all("b").count(), 0);
        assert!(!form.is_checked("printer_test"));
    }

    #[test]
    fn decodes_plus_as_space() {
        let form = FormValues::parse(b"machine_user_name=juan+perez&printer_test=on");
        assert_eq!(form.get("machine_user_name"), "juan perez");
        assert!(form.is_checked("printer_test"));
    }

    #[test]
    fn prefix_iteration_strips_prefix() {
        let form: FormValues = [
            ("peripheral_plate_4", "P-1"),
            ("peripheral_sn_4", "SN"),
            ("peripheral_plate_7", ""),
        ]
        .into_iter()
        .collect();
        let plates: Vec<_> = form.with_prefix("peripheral_plate_").collect();
        assert_eq!(plates, vec![("4", "P-1"), ("7", "")]);
    }
}
