mod fund_wallet_test;
mod registration_test;
