//! User roles for role-based access control
//!
//! Credential verification lives outside this system; the backend only
//! consumes a resolved `(user_id, role)` pair per request or connection.

use serde::{Deserialize, Serialize};

/// Roles of the dairy distribution platform
///
/// - `Vendeur`: field salesperson, creates orders from the mobile app
/// - `GestionnaireCommandes`: manages orders and deliveries
/// - `GestionnaireStocks`: manages products and inventory
/// - `Admin`: full access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Vendeur,
    GestionnaireCommandes,
    GestionnaireStocks,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Vendeur => "vendeur",
            Role::GestionnaireCommandes => "gestionnaire_commandes",
            Role::GestionnaireStocks => "gestionnaire_stocks",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Order managers may mutate order and sale status
    pub fn is_order_manager(&self) -> bool {
        matches!(self, Role::GestionnaireCommandes | Role::Admin)
    }

    /// Stock managers may mutate products and stock
    pub fn is_stock_manager(&self) -> bool {
        matches!(self, Role::GestionnaireStocks | Role::Admin)
    }

    pub fn is_vendor(&self) -> bool {
        matches!(self, Role::Vendeur)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendeur" => Ok(Role::Vendeur),
            "gestionnaire_commandes" => Ok(Role::GestionnaireCommandes),
            "gestionnaire_stocks" => Ok(Role::GestionnaireStocks),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_every_manager_capability() {
        assert!(Role::Admin.is_order_manager());
        assert!(Role::Admin.is_stock_manager());
        assert!(!Role::Admin.is_vendor());
    }

    #[test]
    fn manager_roles_do_not_overlap() {
        assert!(Role::GestionnaireCommandes.is_order_manager());
        assert!(!Role::GestionnaireCommandes.is_stock_manager());
        assert!(Role::GestionnaireStocks.is_stock_manager());
        assert!(!Role::GestionnaireStocks.is_order_manager());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            Role::Vendeur,
            Role::GestionnaireCommandes,
            Role::GestionnaireStocks,
            Role::Admin,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }
}
