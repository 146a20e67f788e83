use std::fmt;
use rust_decimal::Decimal;
use super::{password::{self, ArgonPolicy}, validation};
use crate::utils::errors::{ErrorCode, TurnstileError};

///
/// A user or administrator account: identity, credential and a monetary balance.
///
/// Every constructor and mutator validates before it changes anything, so an Account is never
/// observed in an invalid state. The password is only ever held as an argon2 PHC string.
///
#[derive(Clone)]
pub struct Account {
    id: i64,
    name: String,
    phone: String,
    email: String,
    password_hash: String,
    balance: Decimal,
}

impl Account {
    ///
    /// Register a new account, hashing the plain text password.
    ///
    /// The hash is CPU-bound so async callers should create accounts on the blocking thread pool.
    ///
    pub fn create(id: i64, name: &str, phone: &str, email: &str, plain_text_password: &str, balance: Option<Decimal>, policy: &ArgonPolicy)
        -> Result<Account, TurnstileError> {

        let balance = balance.unwrap_or(Decimal::ZERO);

        validation::validate_name(name)?;
        validation::validate_phone(phone)?;
        validation::validate_email(email)?;
        validation::validate_password(plain_text_password)?;
        validation::validate_balance(balance)?;

        Ok(Account {
            id,
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            password_hash: policy.hash_into_phc(plain_text_password)?,
            balance,
        })
    }

    ///
    /// Rebuild an account from storage. Stored data gets the same scrutiny as new input, a corrupt
    /// record is refused rather than loaded.
    ///
    pub fn from_parts(id: i64, name: &str, phone: &str, email: &str, password_hash: &str, balance: Decimal)
        -> Result<Account, TurnstileError> {

        validation::validate_name(name)?;
        validation::validate_phone(phone)?;
        validation::validate_email(email)?;
        validation::validate_balance(balance)?;
        password::validate_phc(password_hash)?;

        Ok(Account {
            id,
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            balance,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), TurnstileError> {
        validation::validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn set_phone(&mut self, phone: &str) -> Result<(), TurnstileError> {
        validation::validate_phone(phone)?;
        self.phone = phone.to_string();
        Ok(())
    }

    pub fn set_email(&mut self, email: &str) -> Result<(), TurnstileError> {
        validation::validate_email(email)?;
        self.email = email.to_string();
        Ok(())
    }

    ///
    /// Replace the password with a hash of the one given. CPU-bound, see create.
    ///
    pub fn set_password(&mut self, plain_text_password: &str, policy: &ArgonPolicy) -> Result<(), TurnstileError> {
        validation::validate_password(plain_text_password)?;
        self.password_hash = policy.hash_into_phc(plain_text_password)?;
        Ok(())
    }

    ///
    /// Constant-time check of a plain text password against the stored hash. CPU-bound.
    ///
    pub fn verify_password(&self, plain_text_password: &str) -> Result<bool, TurnstileError> {
        password::validate(plain_text_password, &self.password_hash)
    }

    pub fn credit(&mut self, amount: Decimal) -> Result<Decimal, TurnstileError> {
        validation::validate_amount(amount)?;

        self.balance = self.balance
            .checked_add(amount)
            .ok_or_else(|| ErrorCode::InvalidAmountFormat.with_msg(&format!("crediting {} would overflow the balance", amount)))?;

        Ok(self.balance)
    }

    pub fn debit(&mut self, amount: Decimal) -> Result<Decimal, TurnstileError> {
        validation::validate_amount(amount)?;

        if !self.has_sufficient_funds(amount) {
            return Err(ErrorCode::InsufficientFunds
                .with_msg(&format!("a debit of {} exceeds the available balance", amount)))
        }

        self.balance -= amount;
        Ok(self.balance)
    }

    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        amount <= self.balance
    }
}

///
/// Accounts are the same account when their identity matches - id, email and phone. Name,
/// password and balance are state, not identity.
///
impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.email == other.email && self.phone == other.phone
    }
}

impl Eq for Account {}

// Keep the hash out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("phone", &self.phone)
            .field("email", &self.email)
            .field("balance", &self.balance)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use crate::model::password::fast_policy;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn account(balance: &str) -> Account {
        Account::create(1, "Ada", "1234567890", "a@b.com", "Hello123!", Some(dec(balance)), &fast_policy()).unwrap()
    }

    #[test]
    fn test_create_returns_the_input() -> Result<(), TurnstileError> {
        let account = Account::create(7, "Ada Lovelace", "447700900123", "ada@example.com", "analytical", None, &fast_policy())?;

        assert_eq!(account.id(), 7);
        assert_eq!(account.name(), "Ada Lovelace");
        assert_eq!(account.phone(), "447700900123");
        assert_eq!(account.email(), "ada@example.com");
        assert_eq!(account.balance(), Decimal::ZERO);
        assert_ne!(account.password_hash(), "analytical");
        assert!(account.verify_password("analytical")?);
        assert!(!account.verify_password("Analytical")?);
        Ok(())
    }

    #[test]
    fn test_create_rejects_each_bad_field() {
        let policy = fast_policy();
        let cases = vec![
            (Account::create(1, "", "1234567890", "a@b.com", "Hello123!", None, &policy), ErrorCode::InvalidName),
            (Account::create(1, "Ada", "12345", "a@b.com", "Hello123!", None, &policy), ErrorCode::InvalidPhone),
            (Account::create(1, "Ada", "abcdefghij", "a@b.com", "Hello123!", None, &policy), ErrorCode::InvalidPhone),
            (Account::create(1, "Ada", "1234567890", "ab.com", "Hello123!", None, &policy), ErrorCode::InvalidEmail),
            (Account::create(1, "Ada", "1234567890", "a@b.com", "short", None, &policy), ErrorCode::PasswordTooShort),
            (Account::create(1, "Ada", "1234567890", "a@b.com", "Hello123!", Some(dec("-0.01")), &policy), ErrorCode::InvalidBalance),
        ];

        for (result, expected) in cases {
            let err = result.unwrap_err();
            assert!(err.is_validation());
            assert_eq!(err.error_code(), expected);
        }
    }

    #[test]
    fn test_credit() -> Result<(), TurnstileError> {
        let mut account = account("10.00");
        assert_eq!(account.credit(dec("2.50"))?, dec("12.50"));
        assert_eq!(account.credit(Decimal::ZERO)?, dec("12.50"));

        let err = account.credit(dec("-1")).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::NegativeAmount);
        assert_eq!(account.balance(), dec("12.50"));
        Ok(())
    }

    #[test]
    fn test_debit() -> Result<(), TurnstileError> {
        let mut account = account("10.00");
        assert_eq!(account.debit(dec("3.30"))?, dec("6.70"));

        // Exactly the balance is fine.
        assert_eq!(account.debit(dec("6.70"))?, Decimal::ZERO);

        let err = account.debit(dec("0.01")).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InsufficientFunds);
        assert_eq!(account.balance(), Decimal::ZERO);

        let err = account.debit(dec("-1")).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::NegativeAmount);
        assert_eq!(account.balance(), Decimal::ZERO);
        Ok(())
    }

    #[test]
    fn test_decimal_arithmetic_is_exact() -> Result<(), TurnstileError> {
        let mut account = account("0");
        for _ in 0..10 {
            account.credit(dec("0.10"))?;
        }
        assert_eq!(account.balance(), dec("1.00"));
        assert!(account.has_sufficient_funds(dec("1")));
        assert!(!account.has_sufficient_funds(dec("1.000001")));
        Ok(())
    }

    #[test]
    fn test_failed_setters_leave_state_untouched() -> Result<(), TurnstileError> {
        let mut account = account("0");
        let before = account.password_hash().to_string();

        assert!(account.set_phone("123").is_err());
        assert!(account.set_email("nope").is_err());
        assert!(account.set_name(" ").is_err());
        assert!(account.set_password("short", &fast_policy()).is_err());

        assert_eq!(account.phone(), "1234567890");
        assert_eq!(account.email(), "a@b.com");
        assert_eq!(account.name(), "Ada");
        assert_eq!(account.password_hash(), before);

        account.set_password("newpass123", &fast_policy())?;
        assert!(account.verify_password("newpass123")?);
        Ok(())
    }

    #[test]
    fn test_equality_is_identity() -> Result<(), TurnstileError> {
        let first = account("10");
        let mut second = account("99");
        second.set_name("Someone Else")?;
        assert_eq!(first, second);

        second.set_phone("0987654321")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_from_parts_refuses_corrupt_records() {
        let err = Account::from_parts(1, "Ada", "1234567890", "a@b.com", "Hello123!", Decimal::ZERO).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidPHCFormat);

        let err = Account::from_parts(1, "Ada", "1234567890", "a@b.com", "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA", dec("-5")).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidBalance);
    }

    #[test]
    fn test_debug_hides_the_hash() {
        let account = account("0");
        assert!(!format!("{:?}", account).contains("argon2"));
    }
}
