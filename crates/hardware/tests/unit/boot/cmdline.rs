//! # Kernel Command Line Tests

use fsbricks_core::boot::KernelCommandLine;
use fsbricks_core::boot::cmdline::BASE_ARGS;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_fixed_order() {
    let cmdline = KernelCommandLine::new(None);
    assert_eq!(
        cmdline.to_string(),
        "console=ttyAMA0 lpj=19988480 norandmaps root=/dev/vda1 rw init=/home/ubuntu/guestinit.sh"
    );
    assert_eq!(cmdline.args().next(), Some("console=ttyAMA0"));
}

#[test]
fn test_append_goes_last() {
    let cmdline = KernelCommandLine::new(Some("quiet loglevel=0"));
    let args: Vec<&str> = cmdline.args().collect();
    assert_eq!(args.len(), BASE_ARGS.len() + 1);
    assert_eq!(args[..BASE_ARGS.len()], BASE_ARGS);
    assert_eq!(args.last(), Some(&"quiet loglevel=0"));
    assert!(cmdline.to_string().ends_with("guestinit.sh quiet loglevel=0"));
}

#[rstest]
#[case(Some(""))]
#[case(Some("   "))]
#[case(None)]
fn test_blank_append_dropped(#[case] append: Option<&str>) {
    let cmdline = KernelCommandLine::new(append);
    assert_eq!(cmdline.append(), None);
    assert_eq!(cmdline.args().count(), BASE_ARGS.len());
}
