use super::masked_key as masked_key_impl;

#[test]
fn masked_key() {
    assert_eq!(masked_key_impl(None), "not set");
    assert_eq!(masked_key_impl(Some("abc")), "****");
    assert_eq!(masked_key_impl(Some("AIzaSyExample1234")), "****1234");
}
