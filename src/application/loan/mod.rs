mod errors;
mod loan_service;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{
    ServiceDependencies, borrow_book, list_loans, list_member_loans, return_book,
};
