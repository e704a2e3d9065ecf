use actix_web::web::{self};

pub mod routes {
    pub mod membership;
    pub mod pay;
}

pub mod services {
    pub mod gateway;
    pub mod intent;
    pub mod pay;
    pub mod price_book;
    pub mod sub;
}

pub mod dtos {
    pub mod membership;
    pub mod pay;
}

pub mod models {
    pub mod plan;
}

mod misc {
    pub(crate) mod pay;
}

pub fn mount_membership() -> actix_web::Scope {
    web::scope("/membership")
        .service(routes::membership::get_membership)
        .service(routes::membership::post_membership)
}
pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/pay").service(routes::pay::post_webhook)
}
