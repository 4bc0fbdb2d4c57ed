//! Pipeline tests driven through mock connection and wallet
