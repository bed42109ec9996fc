mod guest_cart;
mod persistence;
mod signed_in_cart;
mod test_utils;
