use rocket::Route;

mod admin;
mod auth;
mod common;
mod manager;
mod public;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(manager::routes());
    routes.extend(public::routes());
    routes.extend(auth::routes());
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The admin account is a single credential bootstrapped from config at
    /// launch; there is no account management surface.
    #[test]
    fn no_admin_account_management_routes() {
        assert!(routes()
            .iter()
            .all(|route| !route.uri.to_string().starts_with("/admins")));
    }
}
