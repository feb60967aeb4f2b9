use rocket::Route;

mod verification;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(voting::routes());
    routes.extend(verification::routes());
    routes
}
