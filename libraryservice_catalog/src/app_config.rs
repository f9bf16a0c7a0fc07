use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(web::resource("/members").route(web::get().to(handlers::search_members)))
                .service(
                    web::resource("/members/active")
                        .route(web::get().to(handlers::get_active_members)),
                )
                .service(
                    web::scope("/member")
                        .service(web::resource("").route(web::post().to(handlers::register_member)))
                        .service(
                            web::resource("/{member_id}")
                                .route(web::get().to(handlers::get_member))
                                .route(web::delete().to(handlers::delete_member)),
                        ),
                )
                .service(web::resource("/books").route(web::get().to(handlers::list_books)))
                .service(
                    web::scope("/book")
                        .service(web::resource("").route(web::post().to(handlers::add_book)))
                        .service(
                            web::resource("/{isbn}")
                                .route(web::get().to(handlers::get_book))
                                .route(web::delete().to(handlers::delete_book)),
                        ),
                )
                .service(
                    web::resource("/transaction")
                        .route(web::post().to(handlers::process_transaction)),
                )
                .service(
                    web::resource("/transactions")
                        .route(web::get().to(handlers::list_transactions)),
                )
                .service(
                    web::resource("/history")
                        .route(web::get().to(handlers::get_transaction_history)),
                )
                .service(web::resource("/stats").route(web::get().to(handlers::get_stats))),
        );
}
