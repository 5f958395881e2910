//! Admin API router.
//!
//! Every route but `/health` and `/tables` lives under `/tables/{table}`:
//!
//! ```text
//! GET    /tables/{table}                 overview
//! GET    /tables/{table}/get             key lookup
//! GET    /tables/{table}/items           browse
//! GET    /tables/{table}/meta            description and first raw page
//! GET    /tables/{table}/add-item        new item template
//! PUT    /tables/{table}/add-item        create
//! GET    /tables/{table}/items/{key}     read
//! PUT    /tables/{table}/items/{key}     replace
//! DELETE /tables/{table}/items/{key}     delete
//! ```
//!
//! The table segment is percent-decoded. The key segment is kept as sent
//! because the key codec does its own per-component decoding.

use std::collections::HashMap;
use std::fmt;

use dynadmin_core::AdminError;
use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::ApiError;

/// Query parameters with empty values dropped.
pub type QueryParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRoute {
    Health,
    ListTables,
    TableOverview { table: String },
    KeyLookup { table: String },
    Browse { table: String },
    TableMeta { table: String },
    NewItemTemplate { table: String },
    CreateItem { table: String },
    GetItem { table: String, key: String },
    ReplaceItem { table: String, key: String },
    DeleteItem { table: String, key: String },
}

impl AdminRoute {
    /// Short name for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::ListTables => "ListTables",
            Self::TableOverview { .. } => "TableOverview",
            Self::KeyLookup { .. } => "KeyLookup",
            Self::Browse { .. } => "Browse",
            Self::TableMeta { .. } => "TableMeta",
            Self::NewItemTemplate { .. } => "NewItemTemplate",
            Self::CreateItem { .. } => "CreateItem",
            Self::GetItem { .. } => "GetItem",
            Self::ReplaceItem { .. } => "ReplaceItem",
            Self::DeleteItem { .. } => "DeleteItem",
        }
    }

    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Health | Self::ListTables => None,
            Self::TableOverview { table }
            | Self::KeyLookup { table }
            | Self::Browse { table }
            | Self::TableMeta { table }
            | Self::NewItemTemplate { table }
            | Self::CreateItem { table }
            | Self::GetItem { table, .. }
            | Self::ReplaceItem { table, .. }
            | Self::DeleteItem { table, .. } => Some(table),
        }
    }
}

impl fmt::Display for AdminRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a route from the request method and path.
pub fn resolve_route(method: &Method, path: &str) -> Result<AdminRoute, ApiError> {
    let not_found = || ApiError::NotFound {
        method: method.clone(),
        path: path.to_owned(),
    };
    let not_allowed = || ApiError::MethodNotAllowed {
        method: method.clone(),
        path: path.to_owned(),
    };

    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();

    let route = match segments.as_slice() {
        ["health"] => get_only(method, AdminRoute::Health),
        ["tables"] => get_only(method, AdminRoute::ListTables),
        ["tables", table, rest @ ..] => {
            if table.is_empty() {
                return Err(not_found());
            }
            let table = decode_table(table)?;
            match rest {
                [] => get_only(method, AdminRoute::TableOverview { table }),
                ["get"] => get_only(method, AdminRoute::KeyLookup { table }),
                ["items"] => get_only(method, AdminRoute::Browse { table }),
                ["meta"] => get_only(method, AdminRoute::TableMeta { table }),
                ["add-item"] => match *method {
                    Method::GET => Some(AdminRoute::NewItemTemplate { table }),
                    Method::PUT => Some(AdminRoute::CreateItem { table }),
                    _ => None,
                },
                ["items", key] if !key.is_empty() => {
                    let key = (*key).to_owned();
                    match *method {
                        Method::GET => Some(AdminRoute::GetItem { table, key }),
                        Method::PUT => Some(AdminRoute::ReplaceItem { table, key }),
                        Method::DELETE => Some(AdminRoute::DeleteItem { table, key }),
                        _ => None,
                    }
                }
                _ => return Err(not_found()),
            }
        }
        _ => return Err(not_found()),
    };
    route.ok_or_else(not_allowed)
}

/// Parse a query string, ignoring parameters with empty values.
#[must_use]
pub fn parse_query(query: Option<&str>) -> QueryParams {
    query
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .filter(|(_, value)| !value.is_empty())
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

fn get_only(method: &Method, route: AdminRoute) -> Option<AdminRoute> {
    (*method == Method::GET).then_some(route)
}

fn decode_table(segment: &str) -> Result<String, ApiError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|name| name.into_owned())
        .map_err(|_| {
            ApiError::Admin(AdminError::Validation(
                "table name is not valid UTF-8".to_owned(),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(method: Method, path: &str) -> AdminRoute {
        resolve_route(&method, path).unwrap()
    }

    fn table(name: &str) -> String {
        name.to_owned()
    }

    #[test]
    fn test_should_resolve_every_route() {
        let cases = [
            (Method::GET, "/health", AdminRoute::Health),
            (Method::GET, "/tables", AdminRoute::ListTables),
            (Method::GET, "/tables/", AdminRoute::ListTables),
            (Method::GET, "/tables/users", AdminRoute::TableOverview { table: table("users") }),
            (Method::GET, "/tables/users/get", AdminRoute::KeyLookup { table: table("users") }),
            (Method::GET, "/tables/users/items", AdminRoute::Browse { table: table("users") }),
            (Method::GET, "/tables/users/meta", AdminRoute::TableMeta { table: table("users") }),
            (
                Method::GET,
                "/tables/users/add-item",
                AdminRoute::NewItemTemplate { table: table("users") },
            ),
            (
                Method::PUT,
                "/tables/users/add-item",
                AdminRoute::CreateItem { table: table("users") },
            ),
            (
                Method::GET,
                "/tables/users/items/a%2Cb,1",
                AdminRoute::GetItem {
                    table: table("users"),
                    key: "a%2Cb,1".to_owned(),
                },
            ),
            (
                Method::PUT,
                "/tables/users/items/x",
                AdminRoute::ReplaceItem {
                    table: table("users"),
                    key: "x".to_owned(),
                },
            ),
            (
                Method::DELETE,
                "/tables/users/items/x",
                AdminRoute::DeleteItem {
                    table: table("users"),
                    key: "x".to_owned(),
                },
            ),
        ];
        for (method, path, expected) in cases {
            assert_eq!(route(method, path), expected, "failed for {path}");
        }
    }

    #[test]
    fn test_should_decode_table_segment_only() {
        assert_eq!(
            route(Method::GET, "/tables/my%20table/items/a%2Fb"),
            AdminRoute::GetItem {
                table: table("my table"),
                key: "a%2Fb".to_owned(),
            }
        );
    }

    #[test]
    fn test_should_reject_unknown_paths() {
        for path in ["/", "/nope", "/tables//items", "/tables/t/other", "/tables/t/items/k/extra"] {
            assert!(
                matches!(resolve_route(&Method::GET, path), Err(ApiError::NotFound { .. })),
                "expected not found for {path}"
            );
        }
    }

    #[test]
    fn test_should_reject_wrong_method_on_known_path() {
        for (method, path) in [
            (Method::POST, "/tables"),
            (Method::DELETE, "/tables/t/add-item"),
            (Method::POST, "/tables/t/items/k"),
        ] {
            assert!(matches!(
                resolve_route(&method, path),
                Err(ApiError::MethodNotAllowed { .. })
            ));
        }
    }

    #[test]
    fn test_should_ignore_empty_query_parameters() {
        let params = parse_query(Some("hash=abc&range=&startKey=a%252Cb%2C1&filters="));
        assert_eq!(params.len(), 2);
        assert_eq!(params["hash"], "abc");
        assert_eq!(params["startKey"], "a%2Cb,1");
        assert!(parse_query(None).is_empty());
    }
}
