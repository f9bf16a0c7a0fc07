use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::{Error, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use parking_lot::Mutex;

use crate::api::{
    AddBookRequest, BookFilter, BookListQuery, BookStatus, LoanState, RegisterMemberRequest,
    SearchQuery, TransactionFilter, TransactionKind, TransactionListQuery, TransactionRequest,
};
use crate::catalog_service::{CatalogError, LibraryCatalogService};
use crate::notice::Notice;

/// The one catalog instance of the process, shared by all workers
pub type SharedCatalog = Arc<Mutex<LibraryCatalogService>>;

fn error_response(err: CatalogError) -> HttpResponse {
    let notice = Notice::from(&err);
    match err {
        CatalogError::Validation(_) => HttpResponse::BadRequest().json(notice),
        CatalogError::NotFound(_) => HttpResponse::NotFound().json(notice),
        CatalogError::Duplicate(_) | CatalogError::Unavailable(_) | CatalogError::Conflict(_) => {
            HttpResponse::Conflict().json(notice)
        }
        CatalogError::LimitExceeded { .. } | CatalogError::NoActiveRecord { .. } => {
            HttpResponse::Forbidden().json(notice)
        }
        CatalogError::Storage(err) => {
            tracing::error!("Catalog storage failure {}", err);
            HttpResponse::InternalServerError().json(notice)
        }
    }
}

/// Parses an optional filter value, blank means no filter
fn parse_filter<T>(
    value: Option<&str>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, CatalogError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse(value)
            .map(Some)
            .ok_or_else(|| CatalogError::Validation(format!("Unknown {name} {value}"))),
        None => Ok(None),
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn search_members(
    catalog: Data<SharedCatalog>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner().query.unwrap_or_default();
    Ok(HttpResponse::Ok().json(catalog.lock().search_members(&query)))
}

#[api_v2_operation]
pub async fn get_active_members(catalog: Data<SharedCatalog>) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(catalog.lock().active_members()))
}

#[api_v2_operation]
pub async fn register_member(
    catalog: Data<SharedCatalog>,
    request: web::Json<RegisterMemberRequest>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();
    Ok(
        match catalog
            .lock()
            .register_member(&request.name, &request.email, &request.member_type)
        {
            Ok(outcome) => HttpResponse::Ok()
                .append_header((LOCATION, format!("/api/member/{}", outcome.value.id)))
                .json(outcome),
            Err(err) => error_response(err),
        },
    )
}

#[api_v2_operation]
pub async fn get_member(
    catalog: Data<SharedCatalog>,
    member_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match catalog.lock().member_details(&member_id.into_inner()) {
        Ok(details) => HttpResponse::Ok().json(details),
        Err(err) => error_response(err),
    })
}

#[api_v2_operation]
pub async fn delete_member(
    catalog: Data<SharedCatalog>,
    member_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match catalog.lock().delete_member(&member_id.into_inner()) {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(err) => error_response(err),
    })
}

#[api_v2_operation]
pub async fn list_books(
    catalog: Data<SharedCatalog>,
    query: web::Query<BookListQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    let status = match parse_filter(query.status.as_deref(), "book status", BookStatus::parse) {
        Ok(status) => status,
        Err(err) => return Ok(error_response(err)),
    };
    let filter = BookFilter {
        query: query.query.unwrap_or_default(),
        category: query.category,
        status,
    };
    Ok(HttpResponse::Ok().json(catalog.lock().list_books(&filter)))
}

#[api_v2_operation]
pub async fn add_book(
    catalog: Data<SharedCatalog>,
    request: web::Json<AddBookRequest>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();
    let mut catalog = catalog.lock();
    let result = match &request.isbn {
        Some(isbn) => {
            catalog.add_book_with_isbn(&request.title, &request.author, &request.category, isbn)
        }
        None => catalog.add_book(&request.title, &request.author, &request.category),
    };
    Ok(match result {
        Ok(outcome) => HttpResponse::Ok()
            .append_header((LOCATION, format!("/api/book/{}", outcome.value.isbn)))
            .json(outcome),
        Err(err) => error_response(err),
    })
}

#[api_v2_operation]
pub async fn get_book(
    catalog: Data<SharedCatalog>,
    isbn: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match catalog.lock().get_book(&isbn.into_inner()) {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(err) => error_response(err),
    })
}

#[api_v2_operation]
pub async fn delete_book(
    catalog: Data<SharedCatalog>,
    isbn: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match catalog.lock().delete_book(&isbn.into_inner()) {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(err) => error_response(err),
    })
}

#[api_v2_operation]
pub async fn process_transaction(
    catalog: Data<SharedCatalog>,
    request: web::Json<TransactionRequest>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();
    let Some(kind) = TransactionKind::parse(&request.kind) else {
        return Ok(error_response(CatalogError::Validation(format!(
            "Unknown transaction type {}",
            request.kind
        ))));
    };
    Ok(
        match catalog
            .lock()
            .process_transaction(&request.member_id, &request.book_id, kind)
        {
            Ok(outcome) => HttpResponse::Ok().json(outcome),
            Err(err) => error_response(err),
        },
    )
}

#[api_v2_operation]
pub async fn list_transactions(
    catalog: Data<SharedCatalog>,
    query: web::Query<TransactionListQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    let filters = parse_filter(query.state.as_deref(), "loan state", LoanState::parse).and_then(
        |state| {
            parse_filter(query.kind.as_deref(), "transaction type", TransactionKind::parse)
                .map(|kind| (state, kind))
        },
    );
    let (state, kind) = match filters {
        Ok(filters) => filters,
        Err(err) => return Ok(error_response(err)),
    };
    let filter = TransactionFilter {
        query: query.query.unwrap_or_default(),
        state,
        kind,
    };
    Ok(HttpResponse::Ok().json(catalog.lock().list_transactions(&filter)))
}

#[api_v2_operation]
pub async fn get_transaction_history(
    catalog: Data<SharedCatalog>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner().query.unwrap_or_default();
    Ok(HttpResponse::Ok().json(catalog.lock().get_transaction_history(&query)))
}

#[api_v2_operation]
pub async fn get_stats(catalog: Data<SharedCatalog>) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(catalog.lock().stats()))
}
