//! Face detection and the description of a detected face.
//!
//! We ask Rekognition for the full attribute set of every face in the
//! uploaded image, but only ever use the first face that it reports. Group
//! photos therefore get a story about whoever Rekognition happened to list
//! first.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_rekognition::types::{Attribute, FaceDetail, Image, S3Object};

/// The attributes of one detected face that feed into the story prompt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FaceAttributes {
    pub age_range_low: i32,
    pub age_range_high: i32,
    pub has_sunglasses: bool,
    pub gender: String,
    pub has_beard: bool,
    pub has_mustache: bool,

    /// The first emotion in the classifier's list, taken as-is.
    pub dominant_emotion: String,
}

impl FaceAttributes {
    /// The midpoint of the estimated age range, rounded down.
    pub fn age(&self) -> i32 {
        (self.age_range_low + self.age_range_high).div_euclid(2)
    }

    /// Assemble the one-sentence description used to seed the story prompt.
    ///
    /// Optional clauses appear only when their flag is set. The result is
    /// used verbatim, with no trailing punctuation.
    pub fn descriptor(&self) -> String {
        let mut text = format!("{} years old, ", self.age());

        if self.has_sunglasses {
            text.push_str("using sunglasses, ");
        }

        text.push_str("gender is ");
        text.push_str(&self.gender);
        text.push_str(", ");

        if self.has_beard {
            text.push_str("with beard, ");
        }

        if self.has_mustache {
            text.push_str("with mustache, ");
        }

        text.push_str("and emotion is ");
        text.push_str(&self.dominant_emotion);
        text
    }
}

/// Something that can find faces in an image stored in S3.
#[async_trait]
pub trait FaceClassifier: Send + Sync {
    /// Detect faces in the referenced object, in the order the classifier
    /// reports them. An empty vector means that no face was found.
    async fn detect_faces(&self, bucket: &str, key: &str) -> Result<Vec<FaceAttributes>>;
}

/// Return the first detected face, if any.
pub fn first_face(mut faces: Vec<FaceAttributes>) -> Option<FaceAttributes> {
    if faces.is_empty() {
        None
    } else {
        Some(faces.swap_remove(0))
    }
}

/// [`FaceClassifier`] backed by Amazon Rekognition's `DetectFaces`.
pub struct RekognitionClassifier {
    client: aws_sdk_rekognition::Client,
}

impl RekognitionClassifier {
    pub fn new(client: aws_sdk_rekognition::Client) -> Self {
        RekognitionClassifier { client }
    }
}

#[async_trait]
impl FaceClassifier for RekognitionClassifier {
    async fn detect_faces(&self, bucket: &str, key: &str) -> Result<Vec<FaceAttributes>> {
        let image = Image::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build();

        let resp = self
            .client
            .detect_faces()
            .image(image)
            .attributes(Attribute::All)
            .send()
            .await
            .with_context(|| format!("face detection failed for s3://{bucket}/{key}"))?;

        resp.face_details().iter().map(convert_face_detail).collect()
    }
}

/// Convert Rekognition's face record into our attribute set.
///
/// With the `ALL` attribute set, everything we need should be present; if
/// something is missing we treat the whole response as malformed rather than
/// guessing.
fn convert_face_detail(detail: &FaceDetail) -> Result<FaceAttributes> {
    let age_range = detail
        .age_range()
        .ok_or_else(|| anyhow!("face record has no age range"))?;
    let age_range_low = age_range
        .low()
        .ok_or_else(|| anyhow!("face record has no lower age bound"))?;
    let age_range_high = age_range
        .high()
        .ok_or_else(|| anyhow!("face record has no upper age bound"))?;

    let has_sunglasses = detail
        .sunglasses()
        .ok_or_else(|| anyhow!("face record has no sunglasses attribute"))?
        .value();

    let gender = detail
        .gender()
        .and_then(|g| g.value())
        .ok_or_else(|| anyhow!("face record has no gender attribute"))?
        .as_str()
        .to_owned();

    let has_beard = detail
        .beard()
        .ok_or_else(|| anyhow!("face record has no beard attribute"))?
        .value();

    let has_mustache = detail
        .mustache()
        .ok_or_else(|| anyhow!("face record has no mustache attribute"))?
        .value();

    let dominant_emotion = detail
        .emotions()
        .first()
        .and_then(|e| e.r#type())
        .ok_or_else(|| anyhow!("face record has no emotions"))?
        .as_str()
        .to_owned();

    Ok(FaceAttributes {
        age_range_low,
        age_range_high,
        has_sunglasses,
        gender,
        has_beard,
        has_mustache,
        dominant_emotion,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use aws_sdk_rekognition::operation::detect_faces::DetectFacesOutput;
    use aws_sdk_rekognition::types::{
        AgeRange, Beard, Emotion, EmotionName, Gender, GenderType, Mustache, Sunglasses,
    };
    use aws_smithy_mocks::{mock, mock_client};

    pub(crate) fn sample_face() -> FaceAttributes {
        FaceAttributes {
            age_range_low: 20,
            age_range_high: 30,
            has_sunglasses: true,
            gender: "Male".to_owned(),
            has_beard: false,
            has_mustache: false,
            dominant_emotion: "HAPPY".to_owned(),
        }
    }

    #[test]
    fn age_is_floored_midpoint() {
        let mut face = sample_face();
        assert_eq!(face.age(), 25);

        face.age_range_low = 21;
        face.age_range_high = 22;
        assert_eq!(face.age(), 21);
    }

    #[test]
    fn descriptor_for_sample_face() {
        assert_eq!(
            sample_face().descriptor(),
            "25 years old, using sunglasses, gender is Male, and emotion is HAPPY"
        );
    }

    #[test]
    fn optional_clauses_follow_flags() {
        let face = FaceAttributes {
            has_sunglasses: false,
            has_beard: true,
            has_mustache: false,
            ..sample_face()
        };
        let text = face.descriptor();
        assert!(text.contains("with beard"));
        assert!(!text.contains("using sunglasses"));
        assert!(!text.contains("with mustache"));

        let face = FaceAttributes {
            has_sunglasses: true,
            has_beard: true,
            has_mustache: true,
            gender: "Female".to_owned(),
            dominant_emotion: "CALM".to_owned(),
            ..sample_face()
        };
        assert_eq!(
            face.descriptor(),
            "25 years old, using sunglasses, gender is Female, with beard, with mustache, and emotion is CALM"
        );
    }

    #[test]
    fn descriptor_is_deterministic() {
        let face = sample_face();
        assert_eq!(face.descriptor(), face.descriptor());
    }

    #[test]
    fn first_face_only() {
        let mut other = sample_face();
        other.gender = "Female".to_owned();
        assert_eq!(first_face(vec![]), None);
        assert_eq!(
            first_face(vec![sample_face(), other.clone(), other]),
            Some(sample_face())
        );
    }

    fn rekognition_face(emotions: &[EmotionName]) -> FaceDetail {
        let mut builder = FaceDetail::builder()
            .age_range(AgeRange::builder().low(20).high(30).build())
            .sunglasses(Sunglasses::builder().value(true).build())
            .gender(Gender::builder().value(GenderType::Male).build())
            .beard(Beard::builder().value(false).build())
            .mustache(Mustache::builder().value(false).build());

        for e in emotions {
            builder = builder.emotions(
                Emotion::builder()
                    .r#type(e.clone())
                    .confidence(90.0)
                    .build(),
            );
        }

        builder.build()
    }

    #[tokio::test]
    async fn rekognition_faces_are_converted() {
        let rule = mock!(aws_sdk_rekognition::Client::detect_faces)
            .match_requests(|req| {
                let obj = req.image().and_then(|i| i.s3_object());
                obj.and_then(|o| o.bucket()) == Some("photos")
                    && obj.and_then(|o| o.name()) == Some("user+john.png")
            })
            .then_output(|| {
                DetectFacesOutput::builder()
                    .face_details(rekognition_face(&[EmotionName::Happy, EmotionName::Calm]))
                    .build()
            });
        let client = mock_client!(aws_sdk_rekognition, [&rule]);

        let faces = RekognitionClassifier::new(client)
            .detect_faces("photos", "user+john.png")
            .await
            .unwrap();

        assert_eq!(rule.num_calls(), 1);
        assert_eq!(faces, vec![sample_face()]);
    }

    #[tokio::test]
    async fn rekognition_no_faces() {
        let rule = mock!(aws_sdk_rekognition::Client::detect_faces)
            .then_output(|| DetectFacesOutput::builder().build());
        let client = mock_client!(aws_sdk_rekognition, [&rule]);

        let faces = RekognitionClassifier::new(client)
            .detect_faces("photos", "empty.png")
            .await
            .unwrap();
        assert!(faces.is_empty());
    }

    #[tokio::test]
    async fn rekognition_face_without_emotions_is_malformed() {
        let rule = mock!(aws_sdk_rekognition::Client::detect_faces)
            .then_output(|| {
                DetectFacesOutput::builder()
                    .face_details(rekognition_face(&[]))
                    .build()
            });
        let client = mock_client!(aws_sdk_rekognition, [&rule]);

        let result = RekognitionClassifier::new(client)
            .detect_faces("photos", "odd.png")
            .await;
        assert!(result.is_err());
    }
}
