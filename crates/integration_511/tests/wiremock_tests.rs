//! Integration tests for the 511 client (wiremock-based)

use std::time::Duration;

use domain::ResourceKey;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use integration_511::{MonitoringClient, Transit511Client, Transit511Config, Transit511Error};

fn config_for_mock(base_url: &str) -> Transit511Config {
    Transit511Config {
        timeout_secs: 2,
        ..Transit511Config::for_testing(base_url)
    }
}

const fn sample_stop_json() -> &'static str {
    r#"{
        "ServiceDelivery": {
            "ResponseTimestamp": "2026-10-16T08:00:00Z",
            "StopMonitoringDelivery": {
                "version": "1.4",
                "ResponseTimestamp": "2026-10-16T08:00:00Z",
                "Status": true,
                "MonitoredStopVisit": [
                    {
                        "RecordedAtTime": "2026-10-16T07:59:30Z",
                        "MonitoringRef": "18031",
                        "MonitoredVehicleJourney": {
                            "LineRef": "N",
                            "DirectionRef": "IB",
                            "PublishedLineName": "JUDAH",
                            "OperatorRef": "SF",
                            "OriginName": "Ocean Beach",
                            "DestinationName": "Caltrain/Ball Park",
                            "VehicleLocation": { "Longitude": "-122.43", "Latitude": "37.769" },
                            "Bearing": "90.0",
                            "Occupancy": "seatsAvailable",
                            "VehicleRef": "2043",
                            "MonitoredCall": {
                                "StopPointRef": "18031",
                                "StopPointName": "Duboce Ave & Church St",
                                "AimedArrivalTime": "2026-10-16T08:04:00Z",
                                "ExpectedArrivalTime": "2026-10-16T08:05:00Z"
                            }
                        }
                    },
                    {
                        "RecordedAtTime": "2026-10-16T07:59:10Z",
                        "MonitoredVehicleJourney": {
                            "LineRef": "T",
                            "DirectionRef": "OB",
                            "PublishedLineName": "THIRD STREET",
                            "MonitoredCall": {
                                "StopPointName": "Duboce Ave & Church St",
                                "AimedArrivalTime": "2026-10-16T08:09:00Z"
                            }
                        }
                    }
                ]
            }
        }
    }"#
}

const fn sample_vehicle_json() -> &'static str {
    r#"{
        "ServiceDelivery": {
            "VehicleMonitoringDelivery": {
                "ResponseTimestamp": "2026-10-16T08:00:00Z",
                "VehicleActivity": {
                    "RecordedAtTime": "2026-10-16T07:59:55Z",
                    "MonitoredVehicleJourney": {
                        "LineRef": "14",
                        "PublishedLineName": "MISSION",
                        "VehicleRef": "1502",
                        "VehicleLocation": { "Longitude": -122.418, "Latitude": 37.765 },
                        "Bearing": 180
                    }
                }
            }
        }
    }"#
}

#[tokio::test]
async fn test_fetch_stop_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("format", "JSON"))
        .and(query_param("agency", "SF"))
        .and(query_param("stopCode", "18031"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_stop_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let key = ResourceKey::stop("sf", "18031").unwrap();
    let snapshot = client.fetch(&key).await.unwrap();

    assert_eq!(snapshot.timestamp.as_deref(), Some("2026-10-16T08:00:00Z"));
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.records[0].line_ref.as_deref(), Some("N"));
    assert_eq!(snapshot.records[1].arrival_time(), Some("2026-10-16T08:09:00Z"));
}

#[tokio::test]
async fn test_fetch_vehicle_single_activity() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/VehicleMonitoring"))
        .and(query_param("agency", "SF"))
        .and(query_param("vehicleID", "1502"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_vehicle_json()))
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let key = ResourceKey::vehicle("SF", "1502").unwrap();
    let snapshot = client.fetch(&key).await.unwrap();

    assert_eq!(snapshot.len(), 1);
    let record = &snapshot.records[0];
    assert_eq!(record.vehicle_ref.as_deref(), Some("1502"));
    assert!(record.location.is_some());
}

#[tokio::test]
async fn test_fetch_strips_bom() {
    let server = MockServer::start().await;
    let body = format!("\u{feff}{}", sample_stop_json());

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let snapshot = client
        .fetch(&ResourceKey::stop("SF", "18031").unwrap())
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn test_http_429_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "120"))
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let err = client
        .fetch(&ResourceKey::stop("SF", "18031").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Transit511Error::RateLimited {
            retry_after_secs: Some(120),
            ..
        }
    ));
}

#[tokio::test]
async fn test_rate_limit_sentence_in_200_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("The allowed number of requests has been exceeded."),
        )
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let err = client
        .fetch(&ResourceKey::stop("SF", "18031").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Transit511Error::RateLimited { .. }));
}

#[tokio::test]
async fn test_unauthorized_and_forbidden() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/StopMonitoring"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
        let err = client
            .fetch(&ResourceKey::stop("SF", "18031").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, Transit511Error::AuthFailure { status: s } if s == status));
    }
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let err = client
        .fetch(&ResourceKey::stop("SF", "18031").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Transit511Error::TransportFailure(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_empty_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\u{feff}   "))
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let err = client
        .fetch(&ResourceKey::stop("SF", "18031").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Transit511Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_timeout_is_transport_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sample_stop_json())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let err = client
        .fetch(&ResourceKey::stop("SF", "18031").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Transit511Error::TransportFailure(msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let client = Transit511Client::new(&config_for_mock("http://127.0.0.1:1")).unwrap();
    let err = client
        .fetch(&ResourceKey::stop("SF", "18031").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Transit511Error::TransportFailure(_)));
}

#[tokio::test]
async fn test_validate_credentials_uses_sf_agency() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .and(query_param("agency", "SF"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_stop_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    assert!(client.validate_credentials().await.is_ok());
}

#[tokio::test]
async fn test_validate_credentials_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/StopMonitoring"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = Transit511Client::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.validate_credentials().await.unwrap_err();
    assert!(matches!(err, Transit511Error::AuthFailure { status: 401 }));
}
