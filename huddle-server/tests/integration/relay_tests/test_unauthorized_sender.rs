use huddle_core::{IceCandidateInit, IceCandidateRequest, SdpType, SignalRequest};
use huddle_server::RelayError;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{ANA, BEN, OUTSIDER};

#[tokio::test]
async fn test_outsider_cannot_signal_or_send_candidates() {
    init_tracing();

    let (relay, output, _registry, meeting) = create_test_relay();

    let err = relay
        .relay_signal(meeting, OUTSIDER, SignalRequest::new(ANA, SdpType::Offer, "YQ==".into()))
        .await
        .unwrap_err();
    assert_eq!(err, RelayError::Unauthorized);

    let err = relay
        .relay_ice_candidate(
            meeting,
            OUTSIDER,
            IceCandidateRequest {
                target_user_id: ANA,
                candidate: IceCandidateInit::new("candidate:1 1 udp 1 10.0.0.1 9 typ host"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, RelayError::Unauthorized);

    assert!(output.all().await.is_empty(), "nothing may be delivered");
}

#[tokio::test]
async fn test_departed_participant_is_unauthorized() {
    init_tracing();

    let (relay, output, registry, meeting) = create_test_relay();
    registry.leave(meeting, BEN).expect("ben leaves");

    let err = relay
        .relay_signal(meeting, BEN, SignalRequest::new(ANA, SdpType::Offer, "YQ==".into()))
        .await
        .unwrap_err();
    assert_eq!(err, RelayError::Unauthorized);
    assert!(output.all().await.is_empty());
}

#[tokio::test]
async fn test_authorization_is_checked_before_validation() {
    init_tracing();

    let (relay, _output, _registry, meeting) = create_test_relay();
    let invalid = SignalRequest {
        target_user_id: ANA,
        kind: "bogus".into(),
        sdp: String::new(),
    };

    let err = relay.relay_signal(meeting, OUTSIDER, invalid).await.unwrap_err();
    assert_eq!(err, RelayError::Unauthorized);
}
