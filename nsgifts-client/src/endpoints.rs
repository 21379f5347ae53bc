//! Endpoint catalog: logical operations and the paths they are served on.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Logical API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Signup,
    GetAllServices,
    GetCategories,
    GetServicesByCategory,
    CreateOrder,
    PayOrder,
    CheckBalance,
    CalculateSteamAmount,
    GetSteamCurrencyRate,
    GetUserInfo,
    CalculateSteamGift,
    CreateSteamGiftOrder,
    PaySteamGiftOrder,
    GetOrderInfo,
    GetSteamPackagePrice,
    AddIpToWhitelist,
    RemoveIpFromWhitelist,
    ListWhitelistIps,
}

impl Operation {
    /// Every operation, in catalog order.
    pub const ALL: [Operation; 19] = [
        Operation::Login,
        Operation::Signup,
        Operation::GetAllServices,
        Operation::GetCategories,
        Operation::GetServicesByCategory,
        Operation::CreateOrder,
        Operation::PayOrder,
        Operation::CheckBalance,
        Operation::CalculateSteamAmount,
        Operation::GetSteamCurrencyRate,
        Operation::GetUserInfo,
        Operation::CalculateSteamGift,
        Operation::CreateSteamGiftOrder,
        Operation::PaySteamGiftOrder,
        Operation::GetOrderInfo,
        Operation::GetSteamPackagePrice,
        Operation::AddIpToWhitelist,
        Operation::RemoveIpFromWhitelist,
        Operation::ListWhitelistIps,
    ];

    /// Snake-case operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::Signup => "signup",
            Operation::GetAllServices => "get_all_services",
            Operation::GetCategories => "get_categories",
            Operation::GetServicesByCategory => "get_services_by_category",
            Operation::CreateOrder => "create_order",
            Operation::PayOrder => "pay_order",
            Operation::CheckBalance => "check_balance",
            Operation::CalculateSteamAmount => "calculate_steam_amount",
            Operation::GetSteamCurrencyRate => "get_steam_currency_rate",
            Operation::GetUserInfo => "get_user_info",
            Operation::CalculateSteamGift => "calculate_steam_gift",
            Operation::CreateSteamGiftOrder => "create_steam_gift_order",
            Operation::PaySteamGiftOrder => "pay_steam_gift_order",
            Operation::GetOrderInfo => "get_order_info",
            Operation::GetSteamPackagePrice => "get_steam_package_price",
            Operation::AddIpToWhitelist => "add_ip_to_whitelist",
            Operation::RemoveIpFromWhitelist => "remove_ip_from_whitelist",
            Operation::ListWhitelistIps => "list_whitelist_ips",
        }
    }

    /// Whether a successful response to this operation carries a new token.
    pub fn issues_token(&self) -> bool {
        matches!(self, Operation::Login | Operation::Signup)
    }

    fn default_path(&self) -> &'static str {
        match self {
            Operation::Login => "/auth/login",
            Operation::Signup => "/auth/signup",
            Operation::GetAllServices => "/products/get_all_services",
            Operation::GetCategories => "/products/get_categories",
            Operation::GetServicesByCategory => "/products/get_services_by_category",
            Operation::CreateOrder => "/orders/create_order",
            Operation::PayOrder => "/orders/pay_order",
            Operation::CheckBalance => "/user/check_balance",
            Operation::CalculateSteamAmount => "/steam/calculate_amount",
            Operation::GetSteamCurrencyRate => "/steam/currency_rate",
            Operation::GetUserInfo => "/user/info",
            Operation::CalculateSteamGift => "/steam_gift/calculate",
            Operation::CreateSteamGiftOrder => "/steam_gift/create_order",
            Operation::PaySteamGiftOrder => "/steam_gift/pay_order",
            Operation::GetOrderInfo => "/orders/order_info",
            Operation::GetSteamPackagePrice => "/steam/package_price",
            Operation::AddIpToWhitelist => "/ip_whitelist/add",
            Operation::RemoveIpFromWhitelist => "/ip_whitelist/remove",
            Operation::ListWhitelistIps => "/ip_whitelist/list",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation: {}", s))
    }
}

/// Mapping from operation to endpoint path.
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    paths: HashMap<Operation, String>,
}

impl Default for EndpointCatalog {
    fn default() -> Self {
        Self {
            paths: Operation::ALL
                .iter()
                .map(|op| (*op, op.default_path().to_string()))
                .collect(),
        }
    }
}

impl EndpointCatalog {
    /// Catalog with the standard paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the path of one operation.
    pub fn with_path(mut self, operation: Operation, path: impl Into<String>) -> Self {
        self.paths.insert(operation, path.into());
        self
    }

    /// Path for an operation.
    pub fn path(&self, operation: Operation) -> &str {
        self.paths
            .get(&operation)
            .map(String::as_str)
            .unwrap_or_else(|| operation.default_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operation_has_a_path() {
        let catalog = EndpointCatalog::new();
        for op in Operation::ALL {
            assert!(catalog.path(op).starts_with('/'), "{} has no path", op);
        }
        assert_eq!(catalog.path(Operation::Login), "/auth/login");
    }

    #[test]
    fn test_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>(), Ok(op));
        }
        assert!("nope".parse::<Operation>().is_err());
    }

    #[test]
    fn test_override_path() {
        let catalog = EndpointCatalog::new().with_path(Operation::GetUserInfo, "/v2/me");
        assert_eq!(catalog.path(Operation::GetUserInfo), "/v2/me");
        assert_eq!(catalog.path(Operation::Login), "/auth/login");
    }

    #[test]
    fn test_only_auth_operations_issue_tokens() {
        let issuing: Vec<_> = Operation::ALL.iter().filter(|op| op.issues_token()).collect();
        assert_eq!(issuing, vec![&Operation::Login, &Operation::Signup]);
    }
}
