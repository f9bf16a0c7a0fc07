//! Helpers for the system tests, which run against a live server
//! (`cargo test -p libraryservice_tests --features system_tests`).

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;

use libraryservice_catalog::api::{AddBookRequest, RegisterMemberRequest};

#[cfg(feature = "system_tests")]
mod system_tests;

const MEMBER_TYPES: [&str; 3] = ["student", "faculty", "staff"];
const CATEGORIES: [&str; 4] = ["fiction", "science", "history", "poetry"];

/// Address of the server under test, `LIBRARYSERVICE_URL` or the local default
pub fn service_url() -> String {
    std::env::var("LIBRARYSERVICE_URL").unwrap_or("http://127.0.0.1:8080".to_string())
}

fn random_word(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Member with an email that is unique across test runs
pub fn generate_member(rng: &mut impl Rng, member_type: Option<&str>) -> RegisterMemberRequest {
    let name = random_word(rng, 8);
    RegisterMemberRequest {
        email: format!("{}@{}.test", name.to_lowercase(), random_word(rng, 12).to_lowercase()),
        name,
        member_type: member_type
            .or_else(|| MEMBER_TYPES.choose(rng).copied())
            .unwrap_or("student")
            .to_string(),
    }
}

pub fn generate_book(rng: &mut impl Rng) -> AddBookRequest {
    AddBookRequest {
        title: format!("Title {}", random_word(rng, 10)),
        author: format!("Author {}", random_word(rng, 6)),
        category: CATEGORIES.choose(rng).copied().unwrap_or("fiction").to_string(),
        isbn: None,
    }
}

#[cfg(test)]
mod generator_tests {
    use super::*;

    #[test]
    fn test_generated_requests_are_complete() {
        let mut rng = rand::thread_rng();

        let member = generate_member(&mut rng, Some("staff"));
        assert_eq!(member.member_type, "staff");
        assert!(member.email.contains('@'));
        assert_ne!(member, generate_member(&mut rng, Some("staff")));

        let book = generate_book(&mut rng);
        assert!(CATEGORIES.contains(&book.category.as_str()));
        assert!(book.isbn.is_none());
    }
}
